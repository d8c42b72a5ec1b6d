/// Declares a fieldless enum whose variants are parsed case-insensitively from token
/// parameters and displayed by variant name.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The variant name as written in tokens.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::DescriptorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.name().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| $crate::error::DescriptorError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        available: Self::ALL
                            .iter()
                            .map(|variant| variant.name())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}
