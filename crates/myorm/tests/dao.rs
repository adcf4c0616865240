mod common;

use common::{Person, Script, TABLE_NAME, person, person_rows};
use myorm::{Dao, Op, OrmError, QueryItem, QueryParams, Value};
use std::collections::HashMap;

#[tokio::test]
async fn insert_renders_all_rows() {
    let script = Script::new();
    script.push_affected(2, Some(1));
    let mut client = script.client();

    let result = Dao::new(&mut client)
        .insert(
            TABLE_NAME,
            &["name", "age"],
            &[vec!["a".into(), 1.into()], vec!["b".into(), 2.into()]],
        )
        .await
        .unwrap();

    assert_eq!(result.rows_affected, 2);
    let (sql, args) = script.last();
    assert_eq!(sql, "insert into person (name, age) values (?, ?), (?, ?)");
    assert_eq!(args, vec![Value::from("a"), 1.into(), "b".into(), 2.into()]);
}

#[tokio::test]
async fn insert_without_columns_or_rows_is_rejected() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    assert!(dao.insert(TABLE_NAME, &[], &[vec![1.into()]]).await.unwrap_err().is_validation());
    assert!(dao.insert(TABLE_NAME, &["a"], &[]).await.unwrap_err().is_validation());
    assert!(script.statements().is_empty());
}

#[tokio::test]
async fn delete_by_ids_renders_in_list() {
    let script = Script::new();
    let mut client = script.client();

    Dao::new(&mut client)
        .delete_by_ids(TABLE_NAME, &[14, 15])
        .await
        .unwrap();

    let (sql, args) = script.last();
    assert_eq!(sql, "delete from person where id in (?, ?)");
    assert_eq!(args, vec![Value::Int(14), Value::Int(15)]);
}

#[tokio::test]
async fn empty_id_list_never_reaches_the_link() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    assert!(dao.delete_by_ids(TABLE_NAME, &[]).await.unwrap_err().is_validation());
    assert!(dao.select_by_ids(TABLE_NAME, "*", "", &[]).await.unwrap_err().is_validation());
    assert!(
        dao.update_by_ids(TABLE_NAME, &[], &[QueryItem::pair("name", "x")])
            .await
            .unwrap_err()
            .is_validation()
    );
    assert!(script.statements().is_empty());
}

#[tokio::test]
async fn update_by_id_and_ids() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    dao.update_by_id(TABLE_NAME, 7, &[QueryItem::pair("name", "e"), QueryItem::pair("age", 3)])
        .await
        .unwrap();
    assert_eq!(
        script.last(),
        (
            "update person set name = ?, age = ? where id = ?".to_string(),
            vec![Value::from("e"), 3.into(), 7_i64.into()]
        )
    );

    dao.update_by_ids(TABLE_NAME, &[1, 2], &[QueryItem::pair("age", 4)])
        .await
        .unwrap();
    assert_eq!(script.last().0, "update person set age = ? where id in (?, ?)");

    let err = dao.update_by_id(TABLE_NAME, 7, &[]).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn select_by_id_maps_missing_row_to_none() {
    let script = Script::new();
    script.push_rows(person_rows(&[person(7, "tdj", 30)]));
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    let row = dao.select_by_id(TABLE_NAME, "*", 7).await.unwrap().unwrap();
    assert_eq!(row.try_get_column::<String>("name").unwrap(), "tdj");
    assert_eq!(script.last().0, "select * from person where id = ?");

    assert!(dao.select_by_id(TABLE_NAME, "*", 8).await.unwrap().is_none());
}

#[tokio::test]
async fn select_by_ids_with_order_and_limit() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    dao.select_by_ids(TABLE_NAME, "*", "id desc", &[1, 2, 3]).await.unwrap();
    assert_eq!(
        script.last().0,
        "select * from person where id in (?, ?, ?) order by id desc"
    );

    dao.select_by_ids_limit(TABLE_NAME, "id, name", "", 0, 2, &[1, 2, 3])
        .await
        .unwrap();
    let (sql, args) = script.last();
    assert_eq!(sql, "select id, name from person where id in (?, ?, ?) limit ?, ?");
    assert_eq!(args.len(), 5);
}

#[tokio::test]
async fn totals_read_count_column() {
    let script = Script::new();
    script.push_rows(common::rows(&["count(1)"], vec![vec![Value::Int(12)]]));
    script.push_rows(common::rows(&["count(1)"], vec![vec![Value::from("3")]]));
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    let total = dao
        .select_total_and(TABLE_NAME, &[QueryItem::gte("age", 18), QueryItem::like("name", "t%")])
        .await
        .unwrap();
    assert_eq!(total, 12);
    assert_eq!(
        script.last().0,
        "select count(1) from person where age >= ? and name like ?"
    );

    let total = dao
        .select_total_or(TABLE_NAME, &[QueryItem::eq("name", "a"), QueryItem::eq("name", "b")])
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(
        script.last().0,
        "select count(1) from person where name = ? or name = ?"
    );
}

#[tokio::test]
async fn simple_selects() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    dao.simple_select_and(TABLE_NAME, "*", "id", 10, 5, &[QueryItem::eq("age", 3)])
        .await
        .unwrap();
    assert_eq!(
        script.last(),
        (
            "select * from person where age = ? order by id limit ?, ?".to_string(),
            vec![Value::Int(3), Value::Int(10), Value::Int(5)]
        )
    );

    dao.simple_select_or(TABLE_NAME, "*", "", 0, 0, &[]).await.unwrap();
    assert_eq!(script.last(), ("select * from person".to_string(), vec![]));
}

#[tokio::test]
async fn bad_predicate_is_reported_before_execution() {
    let script = Script::new();
    let mut client = script.client();

    let err = Dao::new(&mut client)
        .simple_select_and(
            TABLE_NAME,
            "*",
            "",
            0,
            10,
            &[QueryItem::new("age", Op::Between, vec![1])],
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(script.statements().is_empty());
}

#[tokio::test]
async fn entity_round_trip_through_dao() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    let people = vec![person(1, "a", 10), person(2, "b", 20)];
    dao.insert_entities(TABLE_NAME, &people).await.unwrap();
    assert_eq!(
        script.last().0,
        "insert into person (id, add_time, edit_time, name, age) values (?, ?, ?, ?, ?), (?, ?, ?, ?, ?)"
    );

    script.push_rows(person_rows(&people));
    let listed: Vec<Person> = dao.list_entities_by_ids(TABLE_NAME, &[1, 2], "id").await.unwrap();
    assert_eq!(listed, people);
}

#[tokio::test]
async fn update_entity_writes_only_changes() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    let stored = person(7, "tdj", 30);
    let mut changed = stored.clone();
    changed.name = "new".to_string();
    changed.age = 31;
    let required: HashMap<&str, bool> = [("name", true), ("age", true)].into_iter().collect();

    script.push_rows(person_rows(&[stored.clone()]));
    let items = dao
        .update_entity_by_id(TABLE_NAME, 7, &changed, &required)
        .await
        .unwrap();
    assert_eq!(
        items,
        vec![QueryItem::pair("name", "new"), QueryItem::pair("age", 31)]
    );
    assert_eq!(
        script.sqls(),
        vec![
            "select * from person where id = ?",
            "update person set name = ?, age = ? where id = ?",
        ]
    );

    // unchanged: read only
    script.push_rows(person_rows(&[stored.clone()]));
    let items = dao
        .update_entity_by_id(TABLE_NAME, 7, &stored, &required)
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(script.statements().len(), 3);

    // missing row
    let items = dao
        .update_entity_by_id(TABLE_NAME, 8, &changed, &required)
        .await
        .unwrap();
    assert!(items.is_empty());

    // zero rows affected
    script.push_rows(person_rows(&[stored]));
    script.push_affected(0, None);
    let items = dao
        .update_entity_by_id(TABLE_NAME, 7, &changed, &required)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn query_params_drive_predicates() {
    let script = Script::new();
    let mut client = script.client();
    let mut dao = Dao::new(&mut client);

    let qp = QueryParams::new(person(0, "t%", 18))
        .filter("name", Op::Like)
        .filter("age", Op::Gte)
        .order_by("id desc")
        .limit(0, 20);

    let found: Vec<Person> = dao.query_entities_and(TABLE_NAME, &qp).await.unwrap();
    assert!(found.is_empty());
    let (sql, args) = script.last();
    assert_eq!(
        sql,
        "select * from person where name like ? and age >= ? order by id desc limit ?, ?"
    );
    assert_eq!(args, vec![Value::from("t%"), 18.into(), 0_i64.into(), 20_i64.into()]);

    script.push_rows(common::rows(&["count(1)"], vec![vec![Value::Int(1)]]));
    let total = dao.total_or(TABLE_NAME, &qp).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(
        script.last().0,
        "select count(1) from person where name like ? or age >= ?"
    );

    let unfiltered = QueryParams::<Person>::default();
    dao.query_entities_or::<Person, _>(TABLE_NAME, &unfiltered).await.unwrap();
    assert_eq!(script.last().0, "select * from person");
}

#[tokio::test]
async fn decode_error_surfaces_from_entity_reads() {
    let script = Script::new();
    script.push_rows(common::rows(&["id"], vec![vec![Value::Int(1)]]));
    let mut client = script.client();

    let err = Dao::new(&mut client)
        .get_entity_by_id::<Person>(TABLE_NAME, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }));
}
