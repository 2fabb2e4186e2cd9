//! Integration tests for the create-container rewrite pipeline.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use weft_docker::{
    ContainerEngine, ContainerInspect, EngineError, ImageConfig, ImageInspect, NetworkSettings,
};
use weft_proxy::intercept::rewrite_create_request;
use weft_proxy::{AddressResolver, NetworkOptOut, ProxyConfig, ProxyError, ProxyState};

#[derive(Clone)]
enum ImageBehavior {
    Found(ImageConfig),
    NotFound,
    Fail,
}

struct MockEngine {
    image: ImageBehavior,
    dns_ip: Option<String>,
}

impl MockEngine {
    fn without_image() -> Self {
        Self {
            image: ImageBehavior::NotFound,
            dns_ip: None,
        }
    }

    fn with_image(config: ImageConfig) -> Self {
        Self {
            image: ImageBehavior::Found(config),
            dns_ip: None,
        }
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn inspect_image(&self, reference: &str) -> weft_docker::Result<ImageInspect> {
        match &self.image {
            ImageBehavior::Found(config) => Ok(ImageInspect {
                config: Some(config.clone()),
            }),
            ImageBehavior::NotFound => Err(EngineError::ImageNotFound(reference.to_string())),
            ImageBehavior::Fail => Err(EngineError::Connection("engine down".to_string())),
        }
    }

    async fn inspect_container(&self, name: &str) -> weft_docker::Result<ContainerInspect> {
        match &self.dns_ip {
            Some(ip) => Ok(ContainerInspect {
                network_settings: Some(NetworkSettings {
                    ip_address: ip.clone(),
                    ..NetworkSettings::default()
                }),
            }),
            None => Err(EngineError::ContainerNotFound(name.to_string())),
        }
    }
}

struct Attach;

impl AddressResolver for Attach {
    fn resolve(
        &self,
        _config: &weft_docker::ContainerConfig,
        _host_config: Option<&weft_docker::HostConfig>,
    ) -> Result<Vec<String>, NetworkOptOut> {
        Ok(vec![])
    }
}

struct OptOut;

impl AddressResolver for OptOut {
    fn resolve(
        &self,
        _config: &weft_docker::ContainerConfig,
        _host_config: Option<&weft_docker::HostConfig>,
    ) -> Result<Vec<String>, NetworkOptOut> {
        Err(NetworkOptOut("overlay not requested".to_string()))
    }
}

fn state_with(
    engine: MockEngine,
    resolver: impl AddressResolver + 'static,
    config: ProxyConfig,
) -> ProxyState {
    ProxyState::new(config, Arc::new(engine), Arc::new(resolver)).expect("state")
}

fn no_dns_config() -> ProxyConfig {
    ProxyConfig {
        without_dns: true,
        ..ProxyConfig::default()
    }
}

async fn rewrite(state: &ProxyState, name: Option<&str>, body: Value) -> Value {
    let input = serde_json::to_vec(&body).unwrap();
    let output = rewrite_create_request(state, name, &input).await.unwrap();
    serde_json::from_slice(&output).unwrap()
}

/// Serves one plain-text domain response per connection.
async fn spawn_nameserver(domain: &'static str) -> u16 {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{domain}",
                domain.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    port
}

// ============================================================================
// Pass-through and round-trip fidelity
// ============================================================================

#[tokio::test]
async fn opt_out_leaves_body_unchanged() {
    let state = state_with(MockEngine::without_image(), OptOut, ProxyConfig::default());
    let body = json!({
        "Image": "alpine",
        "Env": ["FOO=bar"],
        "Labels": {"team": "infra"},
        "StopSignal": "SIGTERM",
        "HostConfig": {"NetworkMode": "bridge", "CapAdd": ["NET_ADMIN"]},
        "MacAddress": "02:42:ac:11:00:02"
    });
    let output = rewrite(&state, Some("db"), body.clone()).await;
    assert_eq!(output, body);
}

#[tokio::test]
async fn opt_out_preserves_field_absence() {
    let state = state_with(MockEngine::without_image(), OptOut, ProxyConfig::default());
    let output = rewrite(&state, None, json!({"Image": "alpine"})).await;
    let obj = output.as_object().unwrap();
    assert!(!obj.contains_key("HostConfig"));
    assert!(!obj.contains_key("Entrypoint"));
    assert!(!obj.contains_key("Hostname"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let state = state_with(MockEngine::without_image(), OptOut, ProxyConfig::default());
    let err = rewrite_create_request(&state, None, b"{not json")
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Decode(_)));
}

// ============================================================================
// Volume injection
// ============================================================================

#[tokio::test]
async fn wait_volume_bind_is_injected() {
    let state = state_with(MockEngine::without_image(), Attach, no_dns_config());
    let body = json!({
        "Image": "alpine",
        "Entrypoint": ["/bin/app"],
        "HostConfig": {"Binds": ["/data:/data:rw"]}
    });
    let output = rewrite(&state, None, body).await;
    assert_eq!(
        output["HostConfig"]["Binds"],
        json!(["/data:/data:rw", "/usr/lib/weft:/w:ro"])
    );
}

#[tokio::test]
async fn rewrite_is_idempotent_for_volume_and_entrypoint() {
    let state = state_with(MockEngine::without_image(), Attach, no_dns_config());
    let body = json!({
        "Image": "alpine",
        "Entrypoint": ["/bin/app"],
        "HostConfig": {"Binds": ["/data:/data"]}
    });
    let once = rewrite(&state, None, body).await;
    let twice = rewrite(&state, None, once.clone()).await;
    assert_eq!(once, twice);
    assert_eq!(
        twice["HostConfig"]["Binds"],
        json!(["/data:/data", "/usr/lib/weft:/w:ro"])
    );
    assert_eq!(twice["Entrypoint"], json!(["/w/w", "/bin/app"]));
}

#[tokio::test]
async fn host_config_is_allocated_when_absent() {
    let state = state_with(MockEngine::without_image(), Attach, no_dns_config());
    let output = rewrite(
        &state,
        None,
        json!({"Image": "alpine", "Entrypoint": ["/bin/app"]}),
    )
    .await;
    assert_eq!(output["HostConfig"]["Binds"], json!(["/usr/lib/weft:/w:ro"]));
}

// ============================================================================
// Entrypoint wrapping
// ============================================================================

#[tokio::test]
async fn already_wrapped_entrypoint_is_untouched() {
    // MockEngine::without_image would fail any image lookup, proving the
    // wrapper does not consult the image when an entrypoint is present.
    let state = state_with(MockEngine::without_image(), Attach, no_dns_config());
    let output = rewrite(
        &state,
        None,
        json!({"Image": "alpine", "Entrypoint": ["/w/w", "/bin/app", "--flag"]}),
    )
    .await;
    assert_eq!(output["Entrypoint"], json!(["/w/w", "/bin/app", "--flag"]));
}

#[tokio::test]
async fn image_defaults_are_adopted() {
    let image = ImageConfig {
        cmd: Some(vec![]),
        entrypoint: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
    };
    let state = state_with(MockEngine::with_image(image), Attach, no_dns_config());
    let output = rewrite(&state, None, json!({"Image": "busybox"})).await;
    assert_eq!(output["Entrypoint"], json!(["/w/w", "/bin/sh", "-c"]));
    assert_eq!(output["Cmd"], json!([]));
}

#[tokio::test]
async fn explicitly_empty_entrypoint_does_not_adopt_image_entrypoint() {
    let image = ImageConfig {
        cmd: None,
        entrypoint: Some(vec!["/bin/sh".to_string()]),
    };
    let state = state_with(MockEngine::with_image(image), Attach, no_dns_config());
    let output = rewrite(
        &state,
        None,
        json!({"Image": "busybox", "Entrypoint": [], "Cmd": ["echo", "hi"]}),
    )
    .await;
    // Present-but-empty keeps the image default out; only the wrapper goes in.
    assert_eq!(output["Entrypoint"], json!(["/w/w"]));
    assert_eq!(output["Cmd"], json!(["echo", "hi"]));
}

#[tokio::test]
async fn missing_image_fails_with_named_error() {
    let state = state_with(MockEngine::without_image(), Attach, no_dns_config());
    let input = serde_json::to_vec(&json!({"Image": "ghost:latest"})).unwrap();
    let err = rewrite_create_request(&state, None, &input)
        .await
        .unwrap_err();
    match &err {
        ProxyError::NoSuchImage(name) => assert_eq!(name, "ghost:latest"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "No such image: ghost:latest");
}

#[tokio::test]
async fn engine_failure_propagates() {
    let state = state_with(
        MockEngine {
            image: ImageBehavior::Fail,
            dns_ip: None,
        },
        Attach,
        no_dns_config(),
    );
    let input = serde_json::to_vec(&json!({"Image": "alpine"})).unwrap();
    let err = rewrite_create_request(&state, None, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Engine(_)));
}

#[tokio::test]
async fn no_command_at_all_is_rejected() {
    let state = state_with(
        MockEngine::with_image(ImageConfig::default()),
        Attach,
        no_dns_config(),
    );
    let input = serde_json::to_vec(&json!({"Image": "scratch"})).unwrap();
    let err = rewrite_create_request(&state, None, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::NoCommandSpecified));
    assert_eq!(err.to_string(), "No command specified");
}

// ============================================================================
// DNS configuration
// ============================================================================

fn entry(input: Value) -> Value {
    let mut body = input;
    body["Entrypoint"] = json!(["/bin/app"]);
    body
}

#[tokio::test]
async fn without_dns_leaves_dns_fields_untouched() {
    let mut engine = MockEngine::without_image();
    engine.dns_ip = Some("10.0.0.5".to_string());
    let state = state_with(engine, Attach, no_dns_config());

    let output = rewrite(&state, Some("db"), entry(json!({"Image": "alpine"}))).await;
    let host = output["HostConfig"].as_object().unwrap();
    assert!(!host.contains_key("Dns"));
    assert!(!host.contains_key("DnsSearch"));
    assert!(!output.as_object().unwrap().contains_key("Hostname"));
}

#[tokio::test]
async fn dns_is_skipped_when_name_service_down_and_not_forced() {
    let state = state_with(MockEngine::without_image(), Attach, ProxyConfig::default());
    let output = rewrite(&state, Some("db"), entry(json!({"Image": "alpine"}))).await;
    let host = output["HostConfig"].as_object().unwrap();
    assert!(!host.contains_key("Dns"));
    assert!(!host.contains_key("DnsSearch"));
    assert!(!output.as_object().unwrap().contains_key("Hostname"));
}

#[tokio::test]
async fn forced_dns_uses_fallback_domain() {
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(&state, None, entry(json!({"Image": "alpine"}))).await;
    assert_eq!(output["HostConfig"]["Dns"], json!(["172.17.0.1"]));
    // No hostname was assigned, so the search path is the full domain.
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["weft.local."]));
    assert!(!output.as_object().unwrap().contains_key("Hostname"));
}

#[tokio::test]
async fn hostname_from_name_parameter() {
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(&state, Some("db"), entry(json!({"Image": "alpine"}))).await;
    assert_eq!(output["Hostname"], json!("db"));
    assert_eq!(output["Domainname"], json!("weft.local"));
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["."]));
}

#[tokio::test]
async fn hostname_at_combined_length_64_is_allowed() {
    // 53 + 1 + len("weft.local") == 64, the documented cutoff.
    let name = "a".repeat(53);
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(&state, Some(&name), entry(json!({"Image": "alpine"}))).await;
    assert_eq!(output["Hostname"], json!(name));
    assert_eq!(output["Domainname"], json!("weft.local"));
}

#[tokio::test]
async fn hostname_at_combined_length_65_is_dropped() {
    let name = "a".repeat(54);
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(&state, Some(&name), entry(json!({"Image": "alpine"}))).await;
    assert!(!output.as_object().unwrap().contains_key("Hostname"));
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["weft.local."]));
}

#[tokio::test]
async fn sixty_four_char_name_is_never_a_hostname() {
    let name = "a".repeat(64);
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(&state, Some(&name), entry(json!({"Image": "alpine"}))).await;
    assert!(!output.as_object().unwrap().contains_key("Hostname"));
}

#[tokio::test]
async fn existing_dns_servers_are_kept() {
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(
        &state,
        None,
        entry(json!({"Image": "alpine", "HostConfig": {"Dns": ["8.8.8.8"]}})),
    )
    .await;
    assert_eq!(output["HostConfig"]["Dns"], json!(["8.8.8.8", "172.17.0.1"]));
}

#[tokio::test]
async fn existing_dns_search_is_not_overwritten() {
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(
        &state,
        None,
        entry(json!({"Image": "alpine", "HostConfig": {"DnsSearch": ["corp.example"]}})),
    )
    .await;
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["corp.example"]));
}

#[tokio::test]
async fn explicit_hostname_is_respected() {
    let config = ProxyConfig {
        with_dns: true,
        ..ProxyConfig::default()
    };
    let state = state_with(MockEngine::without_image(), Attach, config);
    let output = rewrite(
        &state,
        Some("db"),
        entry(json!({"Image": "alpine", "Hostname": "pinned"})),
    )
    .await;
    assert_eq!(output["Hostname"], json!("pinned"));
    assert!(!output.as_object().unwrap().contains_key("Domainname"));
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["."]));
}

#[tokio::test]
async fn running_name_service_supplies_the_domain() {
    let port = spawn_nameserver("weft.test.").await;
    let mut engine = MockEngine::without_image();
    engine.dns_ip = Some("127.0.0.1".to_string());
    let config = ProxyConfig {
        dns_http_port: port,
        ..ProxyConfig::default()
    };
    let state = state_with(engine, Attach, config);

    let output = rewrite(&state, Some("db"), entry(json!({"Image": "alpine"}))).await;
    assert_eq!(output["Hostname"], json!("db"));
    assert_eq!(output["Domainname"], json!("weft.test"));
    assert_eq!(output["HostConfig"]["Dns"], json!(["172.17.0.1"]));
    assert_eq!(output["HostConfig"]["DnsSearch"], json!(["."]));
}
