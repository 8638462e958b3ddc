// Bridge session demo: spawn a local shell responder, discover its tools,
// invoke one, then stop.
//
// Run with: cargo run --example bridge_session

use gantry_core::{telemetry, Bridge, BridgeConfig, BridgeEvent};
use serde_json::json;

// A stand-in integration: answers tools/list and echoes tools/call arguments.
const RESPONDER: &str = r#"
while read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$line" in
    *'"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"echo","description":"Echo a message back","inputSchema":{"type":"object","properties":{"msg":{"type":"string"}},"required":["msg"]}}]}}\n' "$id"
      ;;
    *)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"echoed":true}}\n' "$id"
      ;;
  esac
done
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_with_filter("info,gantry_core=debug");

    let mut config = BridgeConfig::new("sh");
    config.args = vec!["-c".to_string(), RESPONDER.to_string()];

    let bridge = Bridge::new(config)?;

    // Log background events (exits, restarts, notifications).
    let mut events = bridge.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let BridgeEvent::Fatal { code, message } = event {
                tracing::error!(code, message, "bridge went down");
            }
        }
    });

    bridge.start().await?;

    let tools = bridge.list_tools().await?;
    for tool in &tools {
        println!("tool: {} ({} est. tokens)", tool.name, tool.estimated_tokens);
    }

    let result = bridge.call_tool("echo", json!({"msg": "hello"})).await?;
    println!("tools/call result: {result}");

    let status = bridge.status().await;
    println!(
        "status: running={} uptime_ms={} requests={}",
        status.running, status.uptime_ms, status.request_count
    );

    bridge.stop().await?;
    Ok(())
}
