//! Engines built over a template directory and a directory of .proto files.

use std::fs;
use std::sync::Arc;
use synth_engine::{Engine, ProtoEngine, ProtoPool, XmlEngine};
use synth_template::{StoreConfig, TemplateStore};
use tempfile::TempDir;

const SHIPMENT_PROTO: &str = r#"
syntax = "proto3";
package logistics;

import "address.proto";

message Shipment {
  string tracking_id = 1;
  int32 parcels = 2;
  Address destination = 3;
}
"#;

const ADDRESS_PROTO: &str = r#"
syntax = "proto3";
package logistics;

message Address {
  string city = 1;
}
"#;

const SHIPMENT_TEMPLATE: &str = r#"{
  "protoOptions": { "namespace": "logistics", "className": "Shipment" },
  "data": {
    "trackingId": "{{Guid:Tracked:shipment}}",
    "parcels": {{Number:Range:1..9:0}},
    "destination": { "city": "{{JsonCollection:Collection:places:cities}}" }
  }
}"#;

const MANIFEST_TEMPLATE: &str = r#"<Manifest id="{{Guid:Tracked:manifest}}">
  <Item ref="{{Guid:Reference:manifest}}">{{Number:Range:1..9:0}}</Item>
</Manifest>"#;

fn fixture() -> (TempDir, Arc<TemplateStore>) {
    let root = TempDir::new().unwrap();
    let config = StoreConfig::from_root(root.path());
    fs::create_dir_all(&config.collections_dir).unwrap();
    let protos = config.templates_dir.join("Protos");
    fs::create_dir_all(&protos).unwrap();

    fs::write(protos.join("shipment.proto"), SHIPMENT_PROTO).unwrap();
    fs::write(protos.join("address.proto"), ADDRESS_PROTO).unwrap();
    fs::write(config.templates_dir.join("shipment.template.json"), SHIPMENT_TEMPLATE).unwrap();
    fs::write(config.templates_dir.join("manifest.template.xml"), MANIFEST_TEMPLATE).unwrap();
    fs::write(
        config.collections_dir.join("places.collections.json"),
        r#"{"collections": {"cities": ["Oslo"]}}"#,
    )
    .unwrap();

    (root, Arc::new(TemplateStore::new(config)))
}

#[test]
fn test_proto_engine_resolves_imports() {
    let (root, store) = fixture();
    let pool = ProtoPool::from_dir(root.path().join("Templates").join("Protos")).unwrap();
    assert_eq!(
        pool.message_names(),
        vec!["logistics.Address", "logistics.Shipment"]
    );
    let descriptor = pool.message("logistics.Shipment").unwrap();

    let engine =
        ProtoEngine::new(store, "shipments", "shipment.template.json", Arc::new(pool)).unwrap();
    for _ in 0..5 {
        let payload = engine.build_payload(0).unwrap();
        assert_eq!(payload.message_name, "logistics.Shipment");

        let message = descriptor.parse_from_bytes(&payload.bytes).unwrap();
        let decoded: serde_json::Value =
            serde_json::from_str(&protobuf_json_mapping::print_to_string(&*message).unwrap())
                .unwrap();
        let rendered: serde_json::Value = serde_json::from_str(&payload.json).unwrap();
        assert_eq!(decoded["trackingId"], rendered["trackingId"]);
        assert_eq!(decoded["destination"]["city"], "Oslo");
    }
}

#[test]
fn test_xml_engine_keeps_tracked_attributes_consistent() {
    let (_root, store) = fixture();
    let engine = XmlEngine::new(store, "manifests", "manifest.template.xml").unwrap();

    for worker in 0..3 {
        let manifest = engine.build_payload(worker).unwrap();
        assert_eq!(manifest.name, "Manifest");
        let item = manifest.elements().next().unwrap();
        assert_eq!(item.attribute("ref"), manifest.attribute("id"));
        let quantity: u32 = item.text().trim().parse().unwrap();
        assert!((1..=9).contains(&quantity));
    }
}
