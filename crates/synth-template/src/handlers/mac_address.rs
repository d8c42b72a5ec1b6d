//! `{{MacAddress:MacAddress}}` tokens: six random bytes as `AA:BB:CC:DD:EE:FF`.

use super::{HandlerContext, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use rand::{rng, Rng};

const HANDLER: HandlerType = HandlerType::MacAddress;
const MAC_PARAMETERS: usize = 2;

pub struct MacAddressHandler;

impl MacAddressHandler {
    pub fn new(context: HandlerContext<'_>) -> Result<Self, HandlerError> {
        if context.source_type() != SourceType::MacAddress {
            return Err(context.unsupported(HANDLER));
        }
        context.expect_parameters(HANDLER, MAC_PARAMETERS)?;
        Ok(Self)
    }
}

impl TokenHandler for MacAddressHandler {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        let mut bytes = [0u8; 6];
        rng().fill(&mut bytes);
        Ok(bytes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(":"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[test]
    fn test_mac_address_shape() {
        let value = render_token("{{MacAddress:MacAddress}}").unwrap();
        let octets: Vec<&str> = value.split(':').collect();
        assert_eq!(octets.len(), 6);
        for octet in octets {
            assert_eq!(octet.len(), 2);
            assert!(u8::from_str_radix(octet, 16).is_ok());
            assert_eq!(octet, octet.to_uppercase());
        }
    }
}
