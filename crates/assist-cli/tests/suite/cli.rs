use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const METADATA: &str = r#"{
  "groups": [
    { "name": "server", "type": "org.springframework.boot.autoconfigure.web.ServerProperties" },
    {
      "name": "server.servlet.session",
      "sourceType": "org.example.ServerProperties$Servlet",
      "sourceMethod": "getSession()"
    }
  ],
  "properties": [
    {
      "name": "server.port",
      "type": "java.lang.Integer",
      "description": "Server HTTP port. Defaults to 8080.",
      "defaultValue": 8080
    },
    {
      "name": "server.port-legacy",
      "type": "java.lang.Integer",
      "deprecation": { "level": "error", "replacement": "server.port" }
    },
    { "name": "server.servlet.session.timeout", "type": "java.time.Duration" },
    { "name": "server.servlet.session.cookie.name", "type": "java.lang.String" },
    {
      "name": "logging.level",
      "type": "java.util.Map<java.lang.String,java.lang.String>"
    }
  ],
  "hints": [
    {
      "name": "logging.level.values",
      "values": [ { "value": "info" }, { "value": "debug", "description": "Verbose." } ]
    }
  ]
}"#;

fn spring_assist() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("spring-assist"))
}

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("metadata.json").write_str(METADATA).unwrap();
    temp
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_mentions_core_commands() {
    spring_assist().arg("--help").assert().success().stdout(
        predicate::str::contains("resolve")
            .and(predicate::str::contains("complete"))
            .and(predicate::str::contains("describe"))
            .and(predicate::str::contains("files"))
            .and(predicate::str::contains("nav")),
    );
}

#[test]
fn resolve_json_walks_relaxed_names() {
    let temp = workspace();
    let output = spring_assist()
        .current_dir(temp.path())
        .args(["resolve", "SERVER.SERVLET.SESSION", "--metadata", "metadata.json", "--json"])
        .output()
        .unwrap();

    let chain = json_stdout(&output);
    let chain = chain.as_array().unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[2]["kind"], "group");
    assert_eq!(chain[2]["name"], "SERVER.SERVLET.SESSION");
}

#[test]
fn resolve_without_a_match_exits_with_one() {
    let temp = workspace();
    spring_assist()
        .current_dir(temp.path())
        .args(["resolve", "nothing.here", "--metadata", "metadata.json"])
        .assert()
        .code(1);
}

#[test]
fn malformed_names_are_reported() {
    let temp = workspace();
    spring_assist()
        .current_dir(temp.path())
        .args(["resolve", "server[0", "--metadata", "metadata.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn complete_ranks_deprecated_properties_last() {
    let temp = workspace();
    let output = spring_assist()
        .current_dir(temp.path())
        .args(["complete", "server.p", "--metadata", "metadata.json", "--json"])
        .output()
        .unwrap();

    let found = json_stdout(&output);
    let names: Vec<_> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["server.port", "server.port-legacy"]);
    assert_eq!(found[1]["deprecated"], true);
    assert_eq!(found[1]["replacement"], "server.port");
}

#[test]
fn describe_shows_map_value_hints() {
    let temp = workspace();
    let output = spring_assist()
        .current_dir(temp.path())
        .args([
            "describe",
            "logging.level.org.springframework",
            "--metadata",
            "metadata.json",
            "--json",
        ])
        .output()
        .unwrap();

    let description = json_stdout(&output);
    assert_eq!(description["kind"], "map-key");
    let values: Vec<_> = description["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value["value"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["info", "debug"]);
}

#[test]
fn describe_prints_type_default_and_summary() {
    let temp = workspace();
    spring_assist()
        .current_dir(temp.path())
        .args(["describe", "server.port", "--metadata", "metadata.json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("type: Integer")
                .and(predicate::str::contains("default: 8080"))
                .and(predicate::str::contains("Server HTTP port")),
        );
}

#[test]
fn describe_links_the_declaring_member_and_erased_type() {
    let temp = workspace();
    spring_assist()
        .current_dir(temp.path())
        .args(["describe", "server.servlet.session", "--metadata", "metadata.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "declared in: org.example.ServerProperties.Servlet#getSession",
        ));

    let output = spring_assist()
        .current_dir(temp.path())
        .args(["describe", "logging.level", "--metadata", "metadata.json", "--json"])
        .output()
        .unwrap();
    let description = json_stdout(&output);
    assert_eq!(description["base_type"], "Map");
    assert_eq!(description["short_type"], "Map<String,String>");
}

#[test]
fn files_are_discovered_under_build_output() {
    let temp = TempDir::new().unwrap();
    temp.child("target/classes/META-INF/spring-configuration-metadata.json")
        .write_str(METADATA)
        .unwrap();

    let output = spring_assist()
        .current_dir(temp.path())
        .args(["files", "--root", "target", "--json"])
        .output()
        .unwrap();

    let listing = json_stdout(&output);
    let files = listing["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0]
        .as_str()
        .unwrap()
        .ends_with("spring-configuration-metadata.json"));
    assert_eq!(listing["properties"], 5);
}

#[test]
fn missing_metadata_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    spring_assist()
        .current_dir(temp.path())
        .args(["files", "--metadata", "absent.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn nav_resolves_the_key_under_the_cursor() {
    let temp = workspace();
    temp.child("application.properties")
        .write_str("# web\nserver.port=8080\nserver.unknown=1\n")
        .unwrap();

    let output = spring_assist()
        .current_dir(temp.path())
        .args([
            "nav",
            "application.properties",
            "--line",
            "2",
            "--column",
            "3",
            "--metadata",
            "metadata.json",
            "--json",
        ])
        .output()
        .unwrap();
    let view = json_stdout(&output);
    assert_eq!(view["resolved"], "server.port");
    assert_eq!(view["exact"], true);
    assert_eq!(view["target"]["type"], "java.lang.Integer");

    let output = spring_assist()
        .current_dir(temp.path())
        .args([
            "nav",
            "application.properties",
            "--line",
            "3",
            "--column",
            "9",
            "--metadata",
            "metadata.json",
            "--json",
        ])
        .output()
        .unwrap();
    let view = json_stdout(&output);
    assert_eq!(view["resolved"], "server");
    assert_eq!(view["exact"], false);
}
