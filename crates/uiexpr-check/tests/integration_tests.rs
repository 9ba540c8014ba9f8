use miette::Diagnostic;
use rstest::{fixture, rstest};
use serde_json::json;
use uiexpr_check::{Error, Session};
use uiexpr_lang::Options;

const CATALOG: &str = r#"{
  "types": [
    { "namespace": "Game", "name": "Team", "kind": "enum",
      "variants": [{ "name": "Red", "value": 0 }, { "name": "Blue", "value": 1 }] },
    { "namespace": "UnityEngine", "name": "Vector3", "kind": "struct",
      "fields": [
        { "name": "x", "type": "float" },
        { "name": "y", "type": "float" },
        { "name": "z", "type": "float" }
      ],
      "constructors": [[
        { "name": "x", "type": "float" },
        { "name": "y", "type": "float" },
        { "name": "z", "type": "float", "default": 0 }
      ]] },
    { "namespace": "Game", "name": "Entity", "kind": "class",
      "fields": [{ "name": "id", "type": "int" }] },
    { "namespace": "Game", "name": "Player", "kind": "class", "base": "Game.Entity",
      "fields": [
        { "name": "name", "type": "string" },
        { "name": "health", "type": "int" },
        { "name": "team", "type": "Game.Team" },
        { "name": "position", "type": "UnityEngine.Vector3" },
        { "name": "target", "type": "Game.Player" },
        { "name": "waypoints", "type": "List<UnityEngine.Vector3>" },
        { "name": "scores", "type": "Dictionary<string, int>" }
      ] },
    { "namespace": "Game", "name": "Limits", "kind": "static", "parent": "Game.Player",
      "statics": [{ "name": "MaxHealth", "type": "int", "value": 100 }] },
    { "namespace": "Game", "name": "Rules", "kind": "static",
      "statics": [
        { "name": "Title", "type": "string", "value": "arena" },
        { "name": "Gravity", "type": "double", "value": 9.8 }
      ] }
  ]
}"#;

const PLAYER: &str = r#"{
  "id": 7,
  "name": "hero",
  "health": 40,
  "team": "Blue",
  "position": { "x": 1, "y": 2, "z": 3 },
  "waypoints": [{ "x": 0, "y": 0, "z": 0 }, { "x": 5, "y": 0, "z": 9 }],
  "scores": { "kills": 3 }
}"#;

#[fixture]
fn session() -> Session {
    Session::load(
        CATALOG,
        "Player",
        &["Game".to_string(), "UnityEngine".to_string()],
        Options::default(),
    )
    .unwrap()
}

#[rstest]
#[case::field("health", json!(40))]
#[case::inherited_field("id", json!(7))]
#[case::enum_field("team == Team.Blue", json!(true))]
#[case::struct_field("position.z", json!(3.0))]
#[case::null_target("target.health", json!(0))]
#[case::list_index("waypoints[1].z", json!(9.0))]
#[case::list_out_of_range("waypoints[5].z", json!(0.0))]
#[case::dictionary("scores['kills'] + scores['deaths']", json!(3))]
#[case::nested_static("health * 100 / Player.Limits.MaxHealth", json!(40))]
#[case::concat("name + ': ' + health", json!("hero: 40"))]
#[case::constructor("new Vector3(1, 2).x + position.y", json!(3.0))]
#[case::record("new Vector3(1, 2)", json!({"x": 1.0, "y": 2.0, "z": 0.0}))]
#[case::enum_value("team", json!("Blue"))]
fn test_evaluate_against_data(
    session: Session,
    #[case] code: &str,
    #[case] expected: serde_json::Value,
) {
    let instance = session.instance(PLAYER).unwrap();
    let outcome = session.check(code, Some(&instance)).unwrap();

    assert_eq!(outcome.value, Some(expected));
}

#[rstest]
#[case::arithmetic("(1 + 2) * 3", "int", json!(9))]
#[case::static_string("Rules.Title + '!'", "string", json!("arena!"))]
#[case::static_double("Rules.Gravity > 9", "bool", json!(true))]
#[case::enum_constant("Team.Red", "Team", json!("Red"))]
fn test_constant_without_data(
    session: Session,
    #[case] code: &str,
    #[case] yielded_type: &str,
    #[case] expected: serde_json::Value,
) {
    let outcome = session.check(code, None).unwrap();

    assert!(outcome.constant);
    assert_eq!(outcome.yielded_type, yielded_type);
    assert_eq!(outcome.value, Some(expected));
}

#[rstest]
fn test_non_constant_without_data(session: Session) {
    let outcome = session.check("health > 50", None).unwrap();

    assert!(!outcome.constant);
    assert_eq!(outcome.yielded_type, "bool");
    assert_eq!(outcome.value, None);
    assert_eq!(outcome.to_string(), "health > 50: bool");
}

#[rstest]
#[case::missing_member("mana", "CompileError::MemberNotFound")]
#[case::missing_operator("name - 1", "CompileError::MissingOperator")]
#[case::unterminated("'abc", "LexerError::UnterminatedString")]
#[case::trailing_operator("health +", "ParseError::UnexpectedEOFDetected")]
fn test_compile_errors(session: Session, #[case] code: &str, #[case] expected: &str) {
    let err = session.check(code, None).unwrap_err();

    assert_eq!(err.code().map(|code| code.to_string()).as_deref(), Some(expected));
}

#[rstest]
#[case::full_name("Game.Player", &[])]
#[case::imported("Player", &["Game"])]
fn test_context_resolution(#[case] context: &str, #[case] namespaces: &[&str]) {
    let namespaces = namespaces.iter().map(|ns| ns.to_string()).collect::<Vec<_>>();

    assert!(Session::load(CATALOG, context, &namespaces, Options::default()).is_ok());
}

#[rstest]
#[case::unknown("Player")]
#[case::not_a_class("Game.Team")]
#[case::static_type("Game.Rules")]
fn test_invalid_context(#[case] context: &str) {
    let err = Session::load(CATALOG, context, &[], Options::default())
        .err()
        .unwrap();

    assert!(matches!(err, Error::InvalidContext(_)));
}

#[rstest]
#[case::unknown_type(
    r#"{"types": [{"name": "A", "kind": "class", "fields": [{"name": "b", "type": "Missing"}]}]}"#
)]
#[case::unknown_parent(r#"{"types": [{"name": "A", "kind": "class", "parent": "B"}]}"#)]
#[case::bad_kind(r#"{"types": [{"name": "A", "kind": "interface"}]}"#)]
#[case::duplicate(r#"{"types": [{"name": "A", "kind": "class"}, {"name": "A", "kind": "struct"}]}"#)]
#[case::cyclic(
    r#"{"types": [{"name": "A", "kind": "class", "base": "B"}, {"name": "B", "kind": "class", "base": "A"}]}"#
)]
#[case::recursive_struct(
    r#"{"types": [{"name": "A", "kind": "class", "fields": [{"name": "n", "type": "N"}]}, {"name": "N", "kind": "struct", "fields": [{"name": "next", "type": "N"}]}]}"#
)]
fn test_invalid_catalog(#[case] catalog: &str) {
    assert!(Session::load(catalog, "A", &[], Options::default()).is_err());
}

#[rstest]
fn test_invalid_data(session: Session) {
    let err = session.instance(r#"{"health": "full"}"#).unwrap_err();

    match err {
        Error::InvalidData { path, expected, .. } => {
            assert_eq!(path, "$.health");
            assert_eq!(expected, "int");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
fn test_constant_folding_disabled() {
    let session = Session::load(
        CATALOG,
        "Game.Player",
        &["Game".to_string()],
        Options {
            constant_folding: false,
            ..Options::default()
        },
    )
    .unwrap();

    let outcome = session.check("1 + 2", None).unwrap();
    assert!(outcome.constant);
    assert_eq!(outcome.value, Some(json!(3)));
}
