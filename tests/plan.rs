//! End-to-end plan test over a synthetic two-table catalog: a `tenant` root
//! with a `related` child, split into `alpha` and `beta` schemas. Checks the
//! exact emitted SQL, which doubles as the regression snapshot for the print
//! mode's output format.

use pgfission::catalog::{Catalog, Column, ForeignKey, Table};
use pgfission::partition;
use pgfission::plan::{plan, PlanOptions};
use pgfission::runner::print_plan;

fn serial(name: &str) -> Column {
    Column {
        name: name.to_string(),
        data_type: "integer".to_string(),
        not_null: true,
        is_serial: true,
        default: Some(format!("nextval('public.{name}_seq'::regclass)")),
    }
}

fn text(name: &str) -> Column {
    Column {
        name: name.to_string(),
        data_type: "text".to_string(),
        not_null: true,
        is_serial: false,
        default: None,
    }
}

fn integer(name: &str) -> Column {
    Column {
        name: name.to_string(),
        data_type: "integer".to_string(),
        not_null: true,
        is_serial: false,
        default: None,
    }
}

fn tenant_catalog() -> Catalog {
    let mut catalog = Catalog::default();
    catalog.insert(Table {
        name: "tenant".to_string(),
        columns: vec![serial("id"), text("slug")],
        primary_key: vec!["id".to_string()],
        foreign_keys: vec![],
    });
    catalog.insert(Table {
        name: "related".to_string(),
        columns: vec![serial("id"), integer("tenant_id"), text("value")],
        primary_key: vec!["id".to_string()],
        foreign_keys: vec![ForeignKey {
            constraint: "related_tenant_id_fkey".to_string(),
            table: "related".to_string(),
            columns: vec![("tenant_id".to_string(), "id".to_string())],
            ref_table: "tenant".to_string(),
            nullable: false,
        }],
    });
    catalog
}

fn partition_statements(schema: &str) -> Vec<String> {
    vec![
        format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE"),
        format!("CREATE SCHEMA \"{schema}\""),
        format!("CREATE TABLE \"{schema}\".\"tenant\" (LIKE \"public\".\"tenant\" INCLUDING ALL EXCLUDING IDENTITY)"),
        format!("CREATE TABLE \"{schema}\".\"related\" (LIKE \"public\".\"related\" INCLUDING ALL EXCLUDING IDENTITY)"),
        format!("INSERT INTO \"{schema}\".\"tenant\" SELECT \"tenant\".* FROM \"public\".\"tenant\" WHERE \"tenant\".\"slug\" = '{schema}'"),
        format!("INSERT INTO \"{schema}\".\"related\" SELECT \"related\".* FROM \"public\".\"related\" JOIN \"public\".\"tenant\" ON \"related\".\"tenant_id\" = \"tenant\".\"id\" WHERE \"tenant\".\"slug\" = '{schema}'"),
        format!("CREATE SEQUENCE \"{schema}\".\"tenant_id_seq\""),
        format!("ALTER SEQUENCE \"{schema}\".\"tenant_id_seq\" OWNED BY \"{schema}\".\"tenant\".\"id\""),
        format!("ALTER TABLE \"{schema}\".\"tenant\" ALTER COLUMN \"id\" SET DEFAULT nextval('\"{schema}\".\"tenant_id_seq\"'::regclass)"),
        format!("SELECT setval('\"{schema}\".\"tenant_id_seq\"', COALESCE((SELECT MAX(\"id\") FROM \"{schema}\".\"tenant\"), 0) + 1, false)"),
        format!("CREATE SEQUENCE \"{schema}\".\"related_id_seq\""),
        format!("ALTER SEQUENCE \"{schema}\".\"related_id_seq\" OWNED BY \"{schema}\".\"related\".\"id\""),
        format!("ALTER TABLE \"{schema}\".\"related\" ALTER COLUMN \"id\" SET DEFAULT nextval('\"{schema}\".\"related_id_seq\"'::regclass)"),
        format!("SELECT setval('\"{schema}\".\"related_id_seq\"', COALESCE((SELECT MAX(\"id\") FROM \"{schema}\".\"related\"), 0) + 1, false)"),
        format!("ALTER TABLE \"{schema}\".\"related\" ADD CONSTRAINT \"related_tenant_id_fkey\" FOREIGN KEY (\"tenant_id\") REFERENCES \"{schema}\".\"tenant\" (\"id\")"),
    ]
}

#[test]
fn tenant_split_emits_expected_sql() {
    let catalog = tenant_catalog();
    let values = vec![Some("alpha".to_string()), Some("beta".to_string())];
    let partitions = partition::enumerate("slug", values).unwrap();
    assert_eq!(partitions.len(), 2);

    let plan = plan(
        &catalog,
        "tenant",
        "slug",
        &partitions,
        &PlanOptions::default(),
    )
    .unwrap();

    let mut expected = String::new();
    for schema in ["alpha", "beta"] {
        expected.push_str(&format!("-- {schema}\n"));
        for statement in partition_statements(schema) {
            expected.push_str(&statement);
            expected.push('\n');
        }
    }

    let mut out = Vec::new();
    print_plan(&plan, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn rerun_emits_identical_plan() {
    let catalog = tenant_catalog();
    let partitions =
        partition::enumerate("slug", vec![Some("alpha".to_string())]).unwrap();

    let render = || {
        let plan = plan(
            &catalog,
            "tenant",
            "slug",
            &partitions,
            &PlanOptions::default(),
        )
        .unwrap();
        let mut out = Vec::new();
        print_plan(&plan, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    };

    assert_eq!(render(), render());
}
