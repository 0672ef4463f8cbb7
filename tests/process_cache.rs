//! Adapters without an injected cache follow the process-wide toggle.
//!
//! Kept in its own test binary: the toggle is process state.

mod support;

use ai_lib_providers::cache;
use ai_lib_providers::provider::{ApiProvider, ProviderBuilder, ProviderOptions, TextProvider};
use ai_lib_providers::settings;
use serde_json::json;
use support::ScriptedBackend;

#[tokio::test]
async fn test_process_toggle_applies_to_next_call() {
    let upstream = ScriptedBackend::returning(json!("global"));
    let provider = TextProvider::new(
        ProviderBuilder::new("test/process-toggle")
            .options(ProviderOptions::new().with_api_key("r8_test"))
            .backend(upstream.clone()),
    )
    .unwrap();
    let prompt = "process toggle round trip";

    settings::enable_cache();
    assert!(cache::global().is_enabled());
    assert!(!provider.call_api(prompt, None, None).await.unwrap().is_cached());
    assert!(provider.call_api(prompt, None, None).await.unwrap().is_cached());
    assert_eq!(upstream.calls(), 1);

    settings::disable_cache();
    assert!(!settings::is_cache_enabled());
    let response = provider.call_api(prompt, None, None).await.unwrap();
    assert!(!response.is_cached());
    assert_eq!(response.output(), Some("global"));
    assert_eq!(upstream.calls(), 2);

    settings::enable_cache();
    assert!(provider.call_api(prompt, None, None).await.unwrap().is_cached());
    assert_eq!(upstream.calls(), 2);
}
