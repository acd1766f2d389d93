// tests/lighthouse_cli.rs
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use lhpci::login::SessionToken;
use lhpci::measure::{LighthouseCli, MeasureOptions, MeasurementEngine};
use lhpci::session::{NavigationHook, SessionAuth};
use lhpci_test_utils::{init_tracing, with_timeout};

/// Stand-in for the Lighthouse binary: records its arguments one per line
/// in `args.txt` next to itself and writes both reports.
const FAKE_LIGHTHOUSE: &str = r#"#!/bin/sh
dir=$(dirname "$0")
out=""
for arg in "$@"; do
  printf '%s\n' "$arg" >> "$dir/args.txt"
  case "$arg" in
    --output-path=*) out="${arg#--output-path=}" ;;
  esac
done
printf '{"requestedUrl":"%s"}' "$1" > "$out.report.json"
printf '<html>fake</html>' > "$out.report.html"
"#;

fn install_fake(dir: &Path) -> String {
    let bin = dir.join("lighthouse");
    std::fs::write(&bin, FAKE_LIGHTHOUSE).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin.display().to_string()
}

#[tokio::test]
async fn test_auth_cookie_reaches_lighthouse_invocation() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cli = LighthouseCli::new(install_fake(dir.path()));

    let url = "http://localhost:12306/#/dashboard";
    let options = MeasureOptions {
        port: 9333,
        navigation: Some(NavigationHook::new(
            url,
            Some(SessionAuth {
                token: SessionToken::Text("tok-9".into()),
            }),
        )),
    };

    let measurement = with_timeout(cli.measure(url, &options)).await.unwrap();

    assert_eq!(measurement.payload["requestedUrl"], url);
    assert_eq!(measurement.rendered_report, "<html>fake</html>");

    let recorded = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    let args: Vec<&str> = recorded.lines().collect();
    assert_eq!(args[0], url);
    assert!(args.contains(&"--port=9333"), "got {args:?}");
    assert!(
        args.contains(&r#"--extra-headers={"Cookie":"lhtoken=tok-9"}"#),
        "got {args:?}"
    );
}
