use sqlweave::{
    ConfigError, DeleteQuery, Entity, EntityCatalog, EntitySpec, JoinType, LikeMode, LogicalOp,
    Ordering, Projection, PropertySpec, QueryConfig, QueryError, SelectQuery, SqlType, SqlValue,
    Statement, StatementBatch, StaticSource, SubQueryKind, ValueType, col, entity_col,
    function::{count_all, in_list, like, not_in_list},
    projection,
};

struct Property;
struct Owner;

impl Entity for Property {
    const NAME: &'static str = "Property";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME)
            .table("Table1")
            .primary_key("PropertyID")
            .property(PropertySpec::new("PropertyID", ValueType::Int))
            .property(PropertySpec::new("Address", ValueType::String))
            .property(PropertySpec::new("Price", ValueType::Decimal).precision(18, 2))
    }
}

impl Entity for Owner {
    const NAME: &'static str = "Owner";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME)
            .table("Table2")
            .primary_key("OwnerID")
            .property(PropertySpec::new("OwnerID", ValueType::Int))
            .property(PropertySpec::new("PropertyID", ValueType::Int))
            .property(PropertySpec::new("Name", ValueType::String).sql_type(SqlType::VarChar).size(50))
            .property(PropertySpec::new("Region", ValueType::Int))
    }
}

struct PropertySummary;

impl Projection for PropertySummary {
    const FIELDS: &'static [&'static str] = &["PropertyID", "Name", "Unknown"];
}

fn values(statement: &Statement) -> Vec<SqlValue> {
    statement.params.iter().map(|p| p.value.clone()).collect()
}

fn names(statement: &Statement) -> Vec<&str> {
    statement.params.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn equality_conditions_bind_typed_parameters() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .and_where(col::<Property>("PropertyID").eq(99))
        .unwrap()
        .and_where(col::<Property>("Address").eq("hello"))
        .unwrap();
    let statement = query.build().unwrap();

    assert_eq!(
        statement.sql,
        "SELECT * FROM Table1 AS a WHERE a.PropertyID = @p0 AND a.Address = @p1"
    );
    assert_eq!(
        values(&statement),
        vec![SqlValue::from(99), SqlValue::from("hello")]
    );
    assert_eq!(statement.params[0].sql_type, SqlType::Int);
    assert_eq!(statement.params[1].sql_type, SqlType::NVarChar);
}

#[test]
fn literal_takes_the_column_annotations() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query.join::<Property, Owner>(JoinType::Inner, Some("b")).unwrap();
    query
        .and_where(col::<Property>("Price").gt_eq(10))
        .unwrap()
        .and_where(col::<Owner>("Name").eq("Ada"))
        .unwrap();
    let statement = query.build().unwrap();

    let price = &statement.params[0];
    assert_eq!(price.sql_type, SqlType::Decimal);
    assert_eq!((price.precision, price.scale), (Some(18), Some(2)));

    let name = &statement.params[1];
    assert_eq!(name.sql_type, SqlType::VarChar);
    assert_eq!(name.size, Some(50));
}

#[test]
fn convention_join() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .join::<Property, Owner>(JoinType::Inner, Some("b"))
        .unwrap()
        .select_columns_of::<PropertySummary>();

    assert_eq!(
        query.compile().unwrap(),
        "SELECT a.PropertyID, b.Name FROM Table1 AS a \
         INNER JOIN Table2 AS b ON a.PropertyID=b.PropertyID"
    );
}

#[test]
fn explicit_join_with_constant() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .join_on::<Owner>(
            JoinType::Left,
            Some("b"),
            col::<Owner>("PropertyID")
                .eq(col::<Property>("PropertyID"))
                .and(col::<Owner>("Region").eq(4)),
        )
        .unwrap();
    let statement = query.build().unwrap();

    assert_eq!(
        statement.sql,
        "SELECT * FROM Table1 AS a LEFT JOIN Table2 AS b ON a.PropertyID=b.PropertyID \
         AND b.Region=@p0"
    );
    assert_eq!(values(&statement), vec![SqlValue::from(4)]);
}

#[test]
fn empty_set_membership() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .and_where(in_list(col::<Property>("PropertyID"), Vec::<i32>::new()))
        .unwrap()
        .and_where(not_in_list(col::<Property>("PropertyID"), Vec::<i32>::new()))
        .unwrap();
    let statement = query.build().unwrap();

    assert_eq!(
        statement.sql,
        "SELECT * FROM Table1 AS a WHERE a.PropertyID IN () AND a.PropertyID NOT IN ()"
    );
    assert!(statement.params.is_empty());
}

#[test]
fn paging_clamps_the_page_index() {
    for page_index in [0, 1] {
        let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
        query.page(page_index, 10).unwrap();

        assert_eq!(
            query.compile().unwrap(),
            "SELECT * FROM Table1 AS a ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .order_by(col::<Property>("Price"), Ordering::Asc)
        .unwrap()
        .page(3, 25)
        .unwrap();
    assert_eq!(
        query.compile().unwrap(),
        "SELECT * FROM Table1 AS a ORDER BY a.Price ASC OFFSET 50 ROWS FETCH NEXT 25 ROWS ONLY"
    );

    assert!(matches!(
        query.page(1, 0),
        Err(QueryError::InvalidArguments { .. })
    ));
}

#[test]
fn group_by_keeps_the_call_order() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .join::<Property, Owner>(JoinType::Inner, Some("b"))
        .unwrap()
        .group_by(col::<Owner>("Region"))
        .unwrap()
        .group_by(projection([
            ("Id", col::<Property>("PropertyID")),
            ("Address", col::<Property>("Address")),
        ]))
        .unwrap();

    assert!(query.compile().unwrap().ends_with(
        "GROUP BY b.Region, a.PropertyID, a.Address"
    ));
}

#[test]
fn parameter_names_increase_across_clauses_and_sub_queries() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .select_expr("Next", col::<Property>("Price") + 1)
        .unwrap()
        .and_where(col::<Property>("Price").lt(2))
        .unwrap()
        .where_sub_query::<Owner>(
            LogicalOp::And,
            SubQueryKind::Exists,
            Some("o"),
            |sub| {
                sub.select_expr("One", col::<Owner>("OwnerID"))?
                    .and_where(col::<Owner>("Region").eq(3))?
                    .and_where(col::<Owner>("PropertyID").eq(col::<Property>("PropertyID")))?;
                Ok(())
            },
        )
        .unwrap()
        .and_having(count_all().gt(4))
        .unwrap()
        .group_by(col::<Property>("PropertyID"))
        .unwrap();
    let (first_sql, params) = query.into_parts().unwrap();
    assert!(first_sql.contains("EXISTS (SELECT o.OwnerID AS [One] FROM Table2 AS o"));

    let mut delete =
        DeleteQuery::from_with_parameters::<Owner>(params, QueryConfig::default()).unwrap();
    delete.and_where(col::<Owner>("OwnerID").eq(6)).unwrap();
    let statement = delete.build().unwrap();

    assert_eq!(
        names(&statement),
        vec!["@p0", "@p1", "@p2", "@p3", "@p4"]
    );
    assert_eq!(
        statement.sql,
        "DELETE FROM Table2 WHERE Table2.OwnerID = @p4"
    );
}

#[test]
fn zero_values_bind_as_null() {
    let mut query = SelectQuery::from::<Property>(Some("a")).unwrap();
    query
        .and_where(col::<Property>("PropertyID").eq(0))
        .unwrap()
        .and_where(like(col::<Property>("Address"), "o'k", LikeMode::StartsWith))
        .unwrap();
    let statement = query.build().unwrap();

    assert_eq!(
        statement.sql,
        "SELECT * FROM Table1 AS a WHERE a.PropertyID = @p0 AND a.Address LIKE N'o''k%'"
    );
    assert_eq!(values(&statement), vec![SqlValue::Null]);
    assert_eq!(statement.params[0].sql_type, SqlType::Int);
}

#[test]
fn batch_of_statements() {
    let mut delete = DeleteQuery::from::<Owner>().unwrap();
    delete.and_where(col::<Owner>("Region").eq(1)).unwrap();
    let (delete_sql, params) = delete.into_parts().unwrap();

    let mut select =
        SelectQuery::from_with_parameters::<Owner>(Some("o"), params, QueryConfig::default())
            .unwrap();
    select.and_where(col::<Owner>("Region").not_eq(1)).unwrap();
    let select = select.build().unwrap();

    let mut batch = StatementBatch::default();
    batch.push_sql(delete_sql).push(select);
    let statement = batch.build();

    assert_eq!(
        statement.sql,
        "DELETE FROM Table2 WHERE Table2.Region = @p0;\nSELECT * FROM Table2 AS o WHERE o.Region <> @p1"
    );
    // The DELETE's parameter travels with the select's manager.
    assert_eq!(names(&statement), vec!["@p0", "@p1"]);
}

#[test]
fn entities_from_a_json_catalog() {
    let catalog = EntityCatalog::from_json(
        r#"[
            {
                "name": "Venue",
                "table_name": "Venues",
                "primary_key": "Id",
                "properties": [
                    { "name": "Id", "value_type": "Int" },
                    { "name": "City", "value_type": "String", "sql_type": "VarChar", "size": 80 }
                ]
            }
        ]"#,
    )
    .unwrap();

    let mut query =
        SelectQuery::from_spec(catalog.get("Venue").unwrap(), Some("v"), QueryConfig::default())
            .unwrap();
    query
        .select(projection([
            ("Id", entity_col("Venue", "Id")),
            ("Town", entity_col("Venue", "City")),
        ]))
        .unwrap()
        .and_where(entity_col("Venue", "City").eq("Oslo"))
        .unwrap();
    let statement = query.build().unwrap();

    assert_eq!(
        statement.sql,
        "SELECT v.Id, v.City AS [Town] FROM Venues AS v WHERE v.City = @p0"
    );
    assert_eq!(statement.params[0].sql_type, SqlType::VarChar);
    assert_eq!(statement.params[0].size, Some(80));
}

#[test]
fn configuration_from_the_environment() {
    let env = StaticSource::from([
        ("SQLWEAVE_PARAMETER_PREFIX", "arg"),
        ("SQLWEAVE_ALIAS_PREFIX", "tbl"),
    ]);
    let config = QueryConfig::from_env(&env).unwrap();

    let mut query = SelectQuery::with_config::<Property>(None, config).unwrap();
    query.and_where(col::<Property>("PropertyID").eq(7)).unwrap();
    let statement = query.build().unwrap();

    let alias = &query_alias(&statement.sql);
    assert!(alias.starts_with("tbl"));
    assert!(statement.sql.ends_with(&format!("WHERE {alias}.PropertyID = @arg0")));
    assert_eq!(names(&statement), vec!["@arg0"]);

    let invalid = StaticSource::from([("SQLWEAVE_INLINE_LITERALS", "maybe")]);
    assert!(matches!(
        QueryConfig::from_env(&invalid),
        Err(ConfigError::InvalidFlag { .. })
    ));
}

fn query_alias(sql: &str) -> String {
    sql.split(" AS ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}
