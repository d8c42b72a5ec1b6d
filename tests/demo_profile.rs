//! Runs the profile shipped under demos/Profiles end to end.

use datasynth::{ProfileOpts, StdoutSink};
use std::path::PathBuf;
use std::sync::Arc;
use synth_provider::{Provider, ProviderFactory, HEADER_OVERRIDE};
use synth_template::TemplateStore;
use tokio_util::sync::CancellationToken;

fn demo_opts() -> ProfileOpts {
    let mut opts = ProfileOpts::new(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("demos")
            .join("Profiles"),
    );
    opts.shuffle_seed = Some(1);
    opts
}

#[test]
fn test_demo_profile_is_valid() {
    let opts = demo_opts();
    let profile = opts.load_profile().unwrap();
    profile.validate().unwrap();
    assert_eq!(
        profile.provider_names(),
        "orders,events,people,readings,heartbeats,telemetry"
    );

    let store = TemplateStore::new(opts.store_config());
    let templates = store.template_names().unwrap();
    for options in &profile.providers {
        assert!(
            templates.contains(&options.template_name),
            "{} is missing",
            options.template_name
        );
    }
    assert_eq!(
        store.collection_names().unwrap(),
        vec!["customers.collections.csv", "places.collections.json"]
    );
}

#[test]
fn test_demo_order_references_its_customer() {
    let store = TemplateStore::new(demo_opts().store_config());
    for _ in 0..10 {
        let rendered = store.render("orders", "order.template.json", 0).unwrap();
        let order: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let customer = order["customer"].as_str().unwrap();
        assert_eq!(
            order["email"].as_str().unwrap(),
            format!("{customer}@example.com")
        );
        let order_id = order["orderId"].as_str().unwrap();
        for line in order["lines"].as_array().unwrap() {
            assert_eq!(line["order"].as_str().unwrap(), order_id);
        }
    }
}

#[tokio::test]
async fn test_every_demo_provider_packages() {
    let opts = demo_opts();
    let profile = opts.load_profile().unwrap();
    let store = Arc::new(TemplateStore::new(opts.store_config()));
    let engine_config = opts.engine_config();
    assert!(engine_config.protos_dir.is_some());
    let token = CancellationToken::new();
    let sink = StdoutSink::new();

    for options in profile.providers {
        let name = options.provider_name.clone();
        let options = options.with_target_queue_size(16);
        let mut provider =
            ProviderFactory::create(options, Arc::clone(&store), &engine_config, &token).unwrap();

        let package = provider.package().await.unwrap();
        assert!(package.count >= 1, "{name} produced an empty package");
        assert!(!package.is_empty(), "{name} produced no bytes");

        let out = sink.format(&name, &package);
        match name.as_str() {
            "people" => {
                assert_eq!(package.override_value(HEADER_OVERRIDE), Some("Id,Name,Email,Score\n"));
                assert!(out.starts_with("Id,Name,Email,Score\n"));
                assert_eq!(out.lines().count(), 6);
                assert_eq!(package.count, 5);
            }
            "telemetry" => assert!(out.starts_with("[telemetry] ")),
            "readings" => assert!(out.contains("<Reading device=")),
            _ => assert!(out.ends_with('\n')),
        }

        provider.shutdown().await.unwrap();
    }
    token.cancel();
}
