use assist_metadata::name::normalize;
use assist_metadata::PropertyName;
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z][a-z0-9]{0,7}",
        2 => "[a-z][a-z0-9]{0,4}(-[a-z0-9]{1,4}){1,2}",
        2 => "[a-z]{1,4}[A-Z][a-z]{1,4}",
        1 => "[A-Z]{1,3}(_[A-Z0-9]{1,3}){0,2}",
    ]
}

fn arb_bracket() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,3}".prop_map(|index| format!("[{index}]")),
        "[a-zA-Z][a-zA-Z0-9.]{0,6}".prop_map(|key| format!("[{key}]")),
    ]
}

fn arb_element() -> impl Strategy<Value = String> {
    (arb_literal(), prop::collection::vec(arb_bracket(), 0..=2))
        .prop_map(|(literal, brackets)| format!("{literal}{}", brackets.concat()))
}

fn arb_name() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_element(), 1..=5).prop_map(|elements| elements.join("."))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn display_round_trips_through_adapt(raw in arb_name()) {
        let once = PropertyName::adapt(&raw).expect("generated names are well formed");
        let twice = PropertyName::adapt(&once.to_string()).expect("display output re-adapts");
        prop_assert_eq!(twice.to_string(), once.to_string());
        prop_assert_eq!(once.to_string(), raw);
    }

    #[test]
    fn parent_survives_reserialization(raw in arb_name()) {
        let name = PropertyName::adapt(&raw).expect("generated names are well formed");
        let reparsed = PropertyName::adapt(&name.to_string()).expect("display output re-adapts");
        prop_assert_eq!(reparsed.parent(), name.parent());
    }

    #[test]
    fn ancestors_shrink_by_one_segment(raw in arb_name()) {
        let name = PropertyName::adapt(&raw).expect("generated names are well formed");
        let lens: Vec<usize> = name.ancestors().map(|n| n.len()).collect();
        let expected: Vec<usize> = (1..=name.len()).rev().collect();
        prop_assert_eq!(lens, expected);
    }

    #[test]
    fn normalization_is_idempotent(raw in arb_literal()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone());
    }
}

#[test]
fn relaxed_spellings_share_a_key() {
    let keys: Vec<String> = ["server.port", "server-port", "SERVER_PORT", "serverPort"]
        .iter()
        .map(|raw| normalize(raw))
        .collect();
    assert!(keys.iter().all(|key| key == "server-port"), "{keys:?}");

    let dotted: Vec<String> = ["server.servlet.context-path", "SERVER.SERVLET.CONTEXT_PATH", "server.servlet.contextPath"]
        .iter()
        .map(|raw| PropertyName::adapt(raw).unwrap().normalized_key())
        .collect();
    assert!(dotted.iter().all(|key| key == "server.servlet.context-path"), "{dotted:?}");
}
