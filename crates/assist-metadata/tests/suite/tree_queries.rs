use assist_metadata::text::dot_delimited_original_names;
use assist_metadata::{
    build_tree, MergePolicy, MetadataDocument, MetadataSource, NodeKind, PropertyName,
    SuggestionNode, SuggestionTree,
};
use pretty_assertions::assert_eq;

const SERVER: &str = include_str!("../fixtures/server.json");
const DATASOURCE: &str = include_str!("../fixtures/datasource.json");

fn fixture_docs() -> Vec<(MetadataSource, MetadataDocument)> {
    vec![
        (
            MetadataSource::new("server.json"),
            MetadataDocument::from_json(SERVER).unwrap(),
        ),
        (
            MetadataSource::new("datasource.json"),
            MetadataDocument::from_json(DATASOURCE).unwrap(),
        ),
    ]
}

fn fixture_tree() -> SuggestionTree {
    let docs = fixture_docs();
    let (tree, report) = build_tree(docs.iter().map(|(s, d)| (s, d)), MergePolicy::LastWins);
    assert!(report.missing_replacements.is_empty(), "{report:?}");
    assert!(report.unattached_hints.is_empty(), "{report:?}");
    tree
}

fn names(nodes: &[&SuggestionNode]) -> Vec<String> {
    nodes.iter().map(|n| n.original_name().to_string()).collect()
}

#[test]
fn session_group_has_exactly_its_two_children() {
    let tree = fixture_tree();
    let chain = tree.resolve_str("server.servlet.session").unwrap();

    assert_eq!(names(&chain), vec!["server", "servlet", "session"]);
    let session = chain.last().unwrap();
    assert_eq!(session.kind(), NodeKind::Group);
    assert_eq!(session.depth(), 3);
    assert_eq!(names(&session.children().collect::<Vec<_>>()), vec!["cookie", "timeout"]);
}

#[test]
fn map_typed_property_ends_in_map_key_wildcard() {
    let tree = fixture_tree();
    let chain = tree
        .resolve_str("spring.datasource.hikari.data-source-properties.anything")
        .unwrap();

    let last = chain.last().unwrap();
    assert_eq!(last.kind(), NodeKind::MapKey);
    assert_eq!(last.ty().raw(), "java.lang.String");
    assert_eq!(
        dot_delimited_original_names(&chain, 0),
        "spring.datasource.hikari.data-source-properties.*"
    );
}

#[test]
fn relaxed_queries_reach_the_same_node() {
    let tree = fixture_tree();
    let expected = tree.find_str("spring.datasource.hikari.maximum-pool-size").unwrap();
    for raw in [
        "spring.datasource.hikari.maximumPoolSize",
        "SPRING.DATASOURCE.HIKARI.MAXIMUM_POOL_SIZE",
        "spring.datasource.hikari.maximum_pool_size",
    ] {
        let found = tree.find_str(raw).unwrap_or_else(|| panic!("{raw} did not resolve"));
        assert!(std::ptr::eq(found, expected), "{raw}");
    }
}

#[test]
fn logging_levels_absorb_package_names_and_carry_hints() {
    let tree = fixture_tree();
    let chain = tree
        .resolve_str("logging.level.org.springframework.web")
        .unwrap();
    assert_eq!(names(&chain), vec!["logging", "level", "*"]);

    let wildcard = chain.last().unwrap();
    assert_eq!(wildcard.key_hint().unwrap().values.len(), 1);
    assert_eq!(wildcard.hint().unwrap().values.len(), 3);
}

#[test]
fn deprecated_property_ranks_below_its_live_sibling() {
    let tree = fixture_tree();
    let found = tree.complete_str("server.p").unwrap();
    assert_eq!(names(&found), vec!["port", "port-legacy"]);
    assert!(!found[0].is_deprecated());
    assert!(found[1].is_deprecated());
}

#[test]
fn rebuilding_from_the_same_documents_is_deterministic() {
    let first = fixture_tree();
    let second = fixture_tree();

    let queries = [
        "",
        "server.",
        "server.p",
        "server.servlet.",
        "spring.datasource.hikari.",
        "spring.datasource.hikari.data-source-properties.x",
        "logging.level.com.example",
        "nothing.here",
    ];
    for query in queries {
        assert_eq!(
            names(&first.complete_str(query).unwrap()),
            names(&second.complete_str(query).unwrap()),
            "complete {query}"
        );
        let query = query.trim_end_matches('.');
        assert_eq!(
            names(&first.resolve_str(query).unwrap()),
            names(&second.resolve_str(query).unwrap()),
            "resolve {query}"
        );
    }
    assert_eq!(first.property_count(), second.property_count());
    assert_eq!(first.sources(), second.sources());
}

#[test]
fn merge_order_only_affects_scalar_attributes() {
    let docs = fixture_docs();
    let override_doc = MetadataDocument::from_json(
        r#"{ "properties": [ { "name": "server.port", "description": "Overridden." } ] }"#,
    )
    .unwrap();
    let override_source = MetadataSource::new("override.json");

    let all = docs
        .iter()
        .map(|(s, d)| (s, d))
        .chain(std::iter::once((&override_source, &override_doc)));
    let (tree, _) = build_tree(all, MergePolicy::LastWins);

    let port = tree.find(&PropertyName::adapt("server.port").unwrap()).unwrap();
    assert_eq!(port.description(), Some("Overridden."));
    assert_eq!(tree.property_count(), 9);
}

fn two_spellings_tree() -> SuggestionTree {
    let camel = MetadataDocument::from_json(r#"{ "properties": [ { "name": "app.dataSource.url" } ] }"#).unwrap();
    let kebab = MetadataDocument::from_json(r#"{ "properties": [ { "name": "app.data-source.pool" } ] }"#).unwrap();
    let camel_source = MetadataSource::new("camel.json");
    let kebab_source = MetadataSource::new("kebab.json");
    build_tree(
        [(&camel_source, &camel), (&kebab_source, &kebab)],
        MergePolicy::LastWins,
    )
    .0
}

#[test]
fn resolution_backtracks_into_sibling_spellings() {
    let tree = two_spellings_tree();
    for query in ["app.dataSource.url", "app.data-source.url", "APP.DATA_SOURCE.URL"] {
        let chain = tree.resolve_str(query).unwrap();
        assert_eq!(names(&chain), vec!["app", "dataSource", "url"], "{query}");
    }
    for query in ["app.dataSource.pool", "app.data-source.pool"] {
        let chain = tree.resolve_str(query).unwrap();
        assert_eq!(names(&chain), vec!["app", "data-source", "pool"], "{query}");
    }
    assert!(tree.resolve_str("app.data-source.nothing").unwrap().is_empty());
}

#[test]
fn completion_gathers_children_of_every_spelling() {
    let tree = two_spellings_tree();
    assert_eq!(names(&tree.complete_str("app.data-source.u").unwrap()), vec!["url"]);
    assert_eq!(names(&tree.complete_str("app.dataSource.").unwrap()), vec!["pool", "url"]);
}

#[test]
fn completion_offers_every_variant_of_a_normalized_name() {
    let tree = two_spellings_tree();
    assert_eq!(
        names(&tree.complete_str("app.data").unwrap()),
        vec!["data-source", "dataSource"]
    );
}
