//! End-to-end statement compilation through the public API.
//!
//! The compiler is a pure function of its inputs, so the full pipeline is
//! exercised without a database connection.

use queryhaus::prelude::*;
use serde_json::json;

fn compiler() -> SqlCompiler {
    SqlCompiler::new(CompilerConfig::default())
}

#[test]
fn quote_identifier_properties() {
    use queryhaus::sql_builder::compiler::quote_identifier;

    // Word-character identifiers are wrapped exactly once
    assert_eq!(quote_identifier("user_name2"), "`user_name2`");
    // Raw-fragment characters pass through unchanged
    for raw in ["a.b", "*", "count(id)", "a,b", "`q`", "name AS n", "it's"] {
        assert_eq!(quote_identifier(raw), raw);
    }
}

#[test]
fn escape_string_properties() {
    use queryhaus::sql_builder::compiler::escape_string;

    assert_eq!(escape_string("a'b\"c\\d"), "a\\'b\\\"c\\\\d");
    assert_eq!(escape_string("\n\r\t\0\u{001a}"), "\\n\\r\\t\\0\\Z");
    assert_eq!(escape_string(""), "");
    // One escaping pass per compile: escaping the escaped form again
    // doubles backslashes, so the compiler must only ever run it once
    assert_eq!(escape_string("\\n"), "\\\\n");
}

#[test]
fn literal_compilation_properties() {
    use queryhaus::sql_builder::compiler::{compile_value, CompiledValue};

    assert_eq!(
        compile_value(&json!(["exp", "NOW()"])),
        CompiledValue::One("NOW()".to_string())
    );
    assert_eq!(compile_value(&json!(true)), CompiledValue::One("1".to_string()));
    assert_eq!(
        compile_value(&serde_json::Value::Null),
        CompiledValue::One("null".to_string())
    );
}

#[test]
fn select_with_filter_dsl() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({
            "age": {"gt": 18, "lt": 65},
            "name|title": ["like", "dev%"],
        }))
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM `user` WHERE (`age` > 18 AND `age` < 65) AND \
         ((`name` LIKE 'dev%') OR (`title` LIKE 'dev%'))"
    );
    assert!(compiled.warnings.is_empty());
}

#[test]
fn select_join_order_page() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .alias("u")
        .field("u.id,u.name")
        .join(
            JoinSpec::table("posts")
                .alias("p")
                .on_pairs(vec![("author_id".to_string(), "id".to_string())]),
        )
        .where_json(&json!({"p.published": 1}))
        .order_by("u.id", SortOrder::Desc)
        .page_with_size(3, 10)
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT u.id,u.name FROM user AS u LEFT JOIN `posts` AS p \
         ON (u.`author_id`=p.`id`) WHERE (p.published = 1) \
         ORDER BY u.id DESC LIMIT 20,10"
    );
}

#[test]
fn insert_and_update_and_delete() {
    let engine = compiler();

    let mut data = DataMap::new();
    data.insert("name".to_string(), json!("thinker"));
    data.insert("score".to_string(), json!(99));
    let descriptor = QueryBuilder::new().table("user").into_descriptor();
    let insert = engine
        .compile(
            &descriptor,
            StatementKind::Insert {
                data: data.clone(),
                replace: false,
            },
        )
        .unwrap();
    assert_eq!(
        insert.sql,
        "INSERT INTO `user` (`name`,`score`) VALUES ('thinker',99)"
    );

    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"id": 7}))
        .into_descriptor();
    let update = engine
        .compile(&descriptor, StatementKind::Update { data })
        .unwrap();
    assert_eq!(
        update.sql,
        "UPDATE `user` SET `name`='thinker',`score`=99 WHERE (`id` = 7)"
    );

    let delete = engine.compile(&descriptor, StatementKind::Delete).unwrap();
    assert_eq!(delete.sql, "DELETE FROM `user` WHERE (`id` = 7)");
}

#[test]
fn empty_insert_is_a_structural_error() {
    let descriptor = QueryBuilder::new().table("user").into_descriptor();
    let result = compiler().compile(
        &descriptor,
        StatementKind::Insert {
            data: DataMap::new(),
            replace: false,
        },
    );
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

#[test]
fn degraded_compile_reports_warnings() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"good": 1, "bad key!": 2, "also": ["wat", 3]}))
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user` WHERE (`good` = 1)");
    assert_eq!(compiled.warnings.len(), 2);
}

#[test]
fn injection_attempts_are_escaped() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"name": "x'; DROP TABLE user; --"}))
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM `user` WHERE (`name` = 'x\\'; DROP TABLE user; --')"
    );
}

#[test]
fn union_and_lock_round_out_the_template() {
    let archive = QueryBuilder::new().table("user_archive").into_descriptor();
    let descriptor = QueryBuilder::new()
        .table("user")
        .union_query(archive, true)
        .lock(true)
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM `user` UNION ALL (SELECT * FROM `user_archive`) FOR UPDATE"
    );
}
