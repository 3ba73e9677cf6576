//! Full-statement assembly tests

use serde_json::json;

use config::CompilerConfig;

use crate::compiler::builder::QueryBuilder;
use crate::compiler::filter::FilterNode;
use crate::compiler::join::{JoinKind, JoinSpec};
use crate::compiler::ordering::SortOrder;
use crate::compiler::sql_generation::SqlCompiler;
use crate::descriptor::{DataMap, QueryDescriptor, StatementKind};
use crate::errors::CompileError;

fn compiler() -> SqlCompiler {
    SqlCompiler::new(CompilerConfig::default())
}

fn data(pairs: &[(&str, serde_json::Value)]) -> DataMap {
    let mut map = DataMap::new();
    for (key, value) in pairs {
        map.insert(key.to_string(), value.clone());
    }
    map
}

// ========================================
// SELECT
// ========================================

#[test]
fn test_select_minimal() {
    let descriptor = QueryBuilder::new().table("user").into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user`");
    assert!(compiled.warnings.is_empty());
}

#[test]
fn test_select_full_clause_order() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .alias("u")
        .field("id,name")
        .where_json(&json!({"status": 1}))
        .order_by("id", SortOrder::Desc)
        .page_with_size(3, 10)
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `id`,`name` FROM user AS u WHERE (`status` = 1) ORDER BY `id` DESC LIMIT 20,10"
    );
}

#[test]
fn test_select_with_join() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .alias("u")
        .join(
            JoinSpec::table("posts")
                .alias("p")
                .on_pairs(vec![("author_id".to_string(), "id".to_string())]),
        )
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM user AS u LEFT JOIN `posts` AS p ON (u.`author_id`=p.`id`)"
    );
}

#[test]
fn test_select_join_table_prefix() {
    let compiler = SqlCompiler::new(CompilerConfig::new("app_".to_string(), 20, false));
    let descriptor = QueryBuilder::new()
        .table("app_post")
        .join(
            JoinSpec::table("cate")
                .kind(JoinKind::Inner)
                .on_columns("cate_id", "id"),
        )
        .into_descriptor();
    let compiled = compiler.build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM `app_post` INNER JOIN `app_cate` ON app_post.`cate_id`=app_cate.`id`"
    );
}

#[test]
fn test_select_distinct() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .distinct(true)
        .field("name")
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT DISTINCT `name` FROM `user`");
}

#[test]
fn test_select_group_and_having() {
    let descriptor = QueryBuilder::new()
        .table("post")
        .field("cate_id")
        .group("cate_id")
        .having("COUNT(id) > 2")
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `cate_id` FROM `post` GROUP BY `cate_id` HAVING COUNT(id) > 2"
    );
}

#[test]
fn test_select_group_qualified() {
    let descriptor = QueryBuilder::new()
        .table("post")
        .alias("p")
        .group("p.cate_id, day")
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM post AS p GROUP BY p.`cate_id`,`day`"
    );
}

#[test]
fn test_select_union_raw_and_nested() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .union("SELECT * FROM user_old", false)
        .union_query(
            QueryBuilder::new().table("admin").into_descriptor(),
            true,
        )
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM `user` UNION (SELECT * FROM user_old) UNION ALL (SELECT * FROM `admin`)"
    );
}

#[test]
fn test_select_comment_and_lock() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .comment("page query")
        .lock(true)
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user` /* page query */ FOR UPDATE");
}

#[test]
fn test_select_explicit_limit_beats_page() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .limit(5)
        .page_with_size(3, 10)
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user` LIMIT 5");
}

#[test]
fn test_select_bare_page_uses_default_size() {
    let descriptor = QueryBuilder::new().table("user").page(2).into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user` LIMIT 20,20");
}

#[test]
fn test_select_missing_table_is_structural() {
    let descriptor = QueryBuilder::new().into_descriptor();
    assert!(matches!(
        compiler().build_select(&descriptor),
        Err(CompileError::Structural(_))
    ));
}

#[test]
fn test_select_field_alias_map() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .fields(crate::descriptor::FieldList::Aliased(vec![(
            "user_name".to_string(),
            "name".to_string(),
        )]))
        .into_descriptor();
    let compiled = compiler().build_select(&descriptor).unwrap();
    assert_eq!(compiled.sql, "SELECT `user_name` AS `name` FROM `user`");
}

// ========================================
// INSERT / REPLACE
// ========================================

#[test]
fn test_insert() {
    let descriptor = QueryDescriptor::new("user");
    let compiled = compiler()
        .build_insert(
            &data(&[("name", json!("thinker")), ("score", json!(99))]),
            &descriptor,
            false,
        )
        .unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO `user` (`name`,`score`) VALUES ('thinker',99)"
    );
}

#[test]
fn test_replace() {
    let descriptor = QueryDescriptor::new("user");
    let compiled = compiler()
        .build_insert(&data(&[("name", json!("x"))]), &descriptor, true)
        .unwrap();
    assert_eq!(compiled.sql, "REPLACE INTO `user` (`name`) VALUES ('x')");
}

#[test]
fn test_insert_exp_value() {
    let descriptor = QueryDescriptor::new("counter");
    let compiled = compiler()
        .build_insert(
            &data(&[("hits", json!(["exp", "hits+1"])), ("day", json!("mon"))]),
            &descriptor,
            false,
        )
        .unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO `counter` (`hits`,`day`) VALUES (hits+1,'mon')"
    );
}

#[test]
fn test_insert_empty_data_is_structural() {
    let descriptor = QueryDescriptor::new("user");
    let result = compiler().build_insert(&DataMap::new(), &descriptor, false);
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

#[test]
fn test_insert_skips_list_values_with_warning() {
    let descriptor = QueryDescriptor::new("user");
    let compiled = compiler()
        .build_insert(
            &data(&[("name", json!("x")), ("tags", json!([1, 2]))]),
            &descriptor,
            false,
        )
        .unwrap();
    assert_eq!(compiled.sql, "INSERT INTO `user` (`name`) VALUES ('x')");
    assert_eq!(compiled.warnings.len(), 1);
}

#[test]
fn test_insert_many() {
    let descriptor = QueryDescriptor::new("user");
    let rows = vec![
        data(&[("name", json!("a")), ("score", json!(1))]),
        data(&[("name", json!("b")), ("score", json!(2))]),
    ];
    let compiled = compiler()
        .compile(&descriptor, StatementKind::InsertMany { rows, replace: false })
        .unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO `user` (`name`,`score`) VALUES ('a',1),('b',2)"
    );
}

#[test]
fn test_insert_many_empty_is_structural() {
    let descriptor = QueryDescriptor::new("user");
    let result = compiler().compile(
        &descriptor,
        StatementKind::InsertMany {
            rows: Vec::new(),
            replace: false,
        },
    );
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

// ========================================
// UPDATE
// ========================================

#[test]
fn test_update() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"id": 7}))
        .into_descriptor();
    let compiled = compiler()
        .build_update(&data(&[("name", json!("renamed"))]), &descriptor)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE `user` SET `name`='renamed' WHERE (`id` = 7)"
    );
}

#[test]
fn test_update_with_exp_and_limit() {
    let descriptor = QueryBuilder::new()
        .table("counter")
        .where_json(&json!({"day": "mon"}))
        .limit(1)
        .into_descriptor();
    let compiled = compiler()
        .build_update(&data(&[("hits", json!(["exp", "hits+1"]))]), &descriptor)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE `counter` SET `hits`=hits+1 WHERE (`day` = 'mon') LIMIT 1"
    );
}

#[test]
fn test_update_empty_data_is_structural() {
    let descriptor = QueryDescriptor::new("user");
    let result = compiler().build_update(&DataMap::new(), &descriptor);
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

// ========================================
// DELETE
// ========================================

#[test]
fn test_delete() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"status": 0}))
        .order_by("id", SortOrder::Asc)
        .limit(10)
        .into_descriptor();
    let compiled = compiler().build_delete(&descriptor).unwrap();
    assert_eq!(
        compiled.sql,
        "DELETE FROM `user` WHERE (`status` = 0) ORDER BY `id` ASC LIMIT 10"
    );
}

#[test]
fn test_delete_without_filter_compiles_bare() {
    let descriptor = QueryDescriptor::new("session");
    let compiled = compiler().build_delete(&descriptor).unwrap();
    assert_eq!(compiled.sql, "DELETE FROM `session`");
}

// ========================================
// compile() entry point
// ========================================

#[test]
fn test_compile_dispatch() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"id": 1}))
        .into_descriptor();
    let select = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(select.sql, "SELECT * FROM `user` WHERE (`id` = 1)");

    let delete = compiler()
        .compile(&descriptor, StatementKind::Delete)
        .unwrap();
    assert_eq!(delete.sql, "DELETE FROM `user` WHERE (`id` = 1)");
}

#[test]
fn test_compile_is_stateless_across_calls() {
    let engine = compiler();
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"bad key!": 1}))
        .into_descriptor();
    let first = engine
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(first.warnings.len(), 1);

    // The same compiler yields a clean result for a clean descriptor
    let clean = QueryBuilder::new().table("user").into_descriptor();
    let second = engine.compile(&clean, StatementKind::Select).unwrap();
    assert!(second.warnings.is_empty());
    assert_eq!(second.sql, "SELECT * FROM `user`");
}

#[test]
fn test_descriptor_not_mutated_by_compile() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"id": 1, "_logic": "OR"}))
        .page_with_size(2, 5)
        .into_descriptor();
    let snapshot = descriptor.clone();
    let _ = compiler().compile(&descriptor, StatementKind::Select).unwrap();
    assert_eq!(descriptor, snapshot);
}

// ========================================
// Degraded compile keeps the statement
// ========================================

#[test]
fn test_degraded_filter_still_compiles() {
    let descriptor = QueryBuilder::new()
        .table("user")
        .where_json(&json!({"id; DROP": 1, "status": 2}))
        .into_descriptor();
    let compiled = compiler()
        .compile(&descriptor, StatementKind::Select)
        .unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM `user` WHERE (`status` = 2)");
    assert_eq!(compiled.warnings.len(), 1);
}
