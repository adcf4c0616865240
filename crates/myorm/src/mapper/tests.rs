use super::*;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default, Clone, PartialEq)]
struct Audit {
    add_time: String,
    edit_time: String,
}

impl Entity for Audit {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Audit>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder()
                .column("add_time", |a: &Audit| &a.add_time, |a: &mut Audit| &mut a.add_time)
                .column("edit_time", |a: &Audit| &a.edit_time, |a: &mut Audit| &mut a.edit_time)
                .build()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Extra {
    note: String,
}

impl Entity for Extra {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Extra>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder()
                .column("note", |e: &Extra| &e.note, |e: &mut Extra| &mut e.note)
                .build()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    id: i64,
    audit: Audit,
    name: String,
    age: i32,
    extra: Option<Box<Extra>>,
    // not mapped
    scratch: String,
}

impl Entity for Person {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Person>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder()
                .column("id", |p: &Person| &p.id, |p: &mut Person| &mut p.id)
                .embed(|p: &Person| &p.audit, |p: &mut Person| &mut p.audit)
                .column("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
                .column("age", |p: &Person| &p.age, |p: &mut Person| &mut p.age)
                .embed_opt(
                    |p: &Person| p.extra.as_deref(),
                    |p: &mut Person| &mut **p.extra.get_or_insert_with(Default::default),
                )
                .build()
        })
    }
}

fn person() -> Person {
    Person {
        id: 7,
        audit: Audit {
            add_time: "2020-01-01 00:00:00".into(),
            edit_time: "2020-01-02 00:00:00".into(),
        },
        name: "tdj".into(),
        age: 30,
        extra: None,
        scratch: "skip".into(),
    }
}

fn row_for(values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = column_names::<Person>()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into();
    Row::new(columns, values)
}

#[test]
fn columns_are_flattened_in_declaration_order() {
    assert_eq!(
        column_names::<Person>(),
        vec!["id", "add_time", "edit_time", "name", "age", "note"]
    );
}

#[test]
fn absent_optional_record_inserts_null() {
    let values = insert_column_values(&person());
    assert_eq!(values.len(), column_names::<Person>().len());
    assert_eq!(values[0], Value::Int(7));
    assert_eq!(values[3], Value::from("tdj"));
    assert_eq!(values[5], Value::Null);
}

#[test]
fn insert_values_scan_back_to_the_same_entity() {
    let mut expected = person();
    expected.extra = Some(Box::new(Extra { note: "n".into() }));

    let row = row_for(insert_column_values(&expected));
    let mut decoded = Person::default();
    entity_scan_targets(&mut decoded).scan(&row).unwrap();

    expected.scratch.clear();
    assert_eq!(decoded, expected);
}

#[test]
fn scan_allocates_optional_record() {
    let mut values = insert_column_values(&person());
    values[5] = Value::from("hello");

    let mut decoded = Person::default();
    assert!(decoded.extra.is_none());
    entity_scan_targets(&mut decoded).scan(&row_for(values)).unwrap();
    assert_eq!(decoded.extra.unwrap().note, "hello");
}

#[test]
fn scan_rejects_column_count_mismatch() {
    let mut decoded = Person::default();
    let mut targets = entity_scan_targets(&mut decoded);
    assert_eq!(targets.len(), 6);
    let err = targets.scan_values(&[Value::Int(1)]).unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }));
}

#[test]
fn scan_reports_the_failing_column() {
    let mut values = insert_column_values(&person());
    values[4] = Value::from("not a number");

    let err = entity_scan_targets(&mut Person::default())
        .scan(&row_for(values))
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "age"));
}

#[test]
fn unchanged_entity_yields_no_update_items() {
    let required: HashMap<&str, bool> = [("name", true)].into_iter().collect();
    assert!(update_items(&person(), &person(), &required).is_empty());
}

#[test]
fn update_items_only_cover_required_changes() {
    let old = person();
    let mut new = person();
    new.name = "new".into();
    new.age = 31;
    new.audit.edit_time = "2021-01-01 00:00:00".into();

    let required: HashMap<String, bool> = [
        ("name".to_string(), true),
        ("age".to_string(), false),
        ("edit_time".to_string(), true),
    ]
    .into_iter()
    .collect();

    let items = update_items(&old, &new, &required);
    assert_eq!(
        items,
        vec![
            QueryItem::pair("edit_time", "2021-01-01 00:00:00"),
            QueryItem::pair("name", "new"),
        ]
    );
}

#[test]
fn update_items_skip_unreachable_fields() {
    let old = person();
    let mut new = person();
    new.extra = Some(Box::new(Extra { note: "x".into() }));

    let required: HashMap<&str, bool> = [("note", true)].into_iter().collect();
    assert!(update_items(&old, &new, &required).is_empty());
}

#[test]
fn query_items_need_required_and_condition() {
    let required: HashMap<&str, bool> =
        [("name", true), ("age", true), ("id", false)].into_iter().collect();
    let conditions: HashMap<&str, Op> =
        [("name", Op::Like), ("id", Op::Eq)].into_iter().collect();

    let items = query_items(&person(), &required, &conditions);
    assert_eq!(items, vec![QueryItem::new("name", Op::Like, "tdj")]);
}

#[test]
fn scan_rows_appends_and_leaves_list_alone_on_empty() {
    let mut out: Vec<Person> = Vec::new();
    scan_rows_to_list::<Person>(&[], &mut out).unwrap();
    assert!(out.is_empty());

    let rows = vec![
        row_for(insert_column_values(&person())),
        row_for(insert_column_values(&Person {
            id: 8,
            ..person()
        })),
    ];
    scan_rows_to_list(&rows, &mut out).unwrap();
    assert_eq!(out.iter().map(|p| p.id).collect::<Vec<_>>(), vec![7, 8]);
}

#[test]
fn set_column_by_name() {
    let mut p = Person::default();
    set_column(&mut p, "id", Value::Int(42)).unwrap();
    set_column(&mut p, "note", Value::from("n")).unwrap();
    assert_eq!(p.id, 42);
    assert_eq!(p.extra.unwrap().note, "n");

    let err = set_column(&mut Person::default(), "scratch", Value::Null).unwrap_err();
    assert!(err.is_validation());
}
