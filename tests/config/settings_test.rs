#[cfg(test)]
mod tests {
    use std::env;
    use std::path::{Path, PathBuf};

    use starcube::config::{CubeFile, SettingsError, CONFIG_ENV_VAR};
    use starcube::coerce::CoerceError;
    use starcube::cube::{AggregateFunction, CubeError};
    use starcube::io::OutputFormat;
    use starcube::join::{JoinError, LookupError};
    use starcube::model::{DataType, ExprError};

    fn demo_file() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/sample_schema/cube.toml")
    }

    const BASE_TABLES: &str = r#"
[tables.fact]
columns = [
    { name = "customer_id", type = "int" },
    { name = "quantity", type = "int" },
    { name = "note", type = "text" },
]

[tables.dim_customer]
columns = [
    { name = "customer_id", type = "int" },
    { name = "region", type = "text" },
]

[star]
fact = "fact"
dimensions = [{ table = "dim_customer", key = "customer_id", foreign_key = "customer_id" }]
"#;

    fn with_cube(cube: &str) -> CubeFile {
        CubeFile::from_toml(&format!("{}\n[cube]\n{}", BASE_TABLES, cube)).unwrap()
    }

    #[test]
    fn test_parse_demo_cube_file() {
        let file = CubeFile::from_file(demo_file()).unwrap();

        assert_eq!(file.name(), "sales_cube");
        assert_eq!(file.tables.len(), 4);
        assert_eq!(file.star.fact, "fact_sales");
        let aliases: Vec<_> = file.star.dimensions.iter().map(|d| d.alias()).collect();
        assert_eq!(aliases, vec!["c", "p", "d"]);
        assert_eq!(file.output.format, OutputFormat::Csv);
        assert_eq!(file.output.preview_rows, 12);
        assert_eq!(file.table_file("dim_date").unwrap(), "dim_date.csv");
        assert_eq!(
            file.data_dir(None).unwrap(),
            demo_file().parent().unwrap().join("data")
        );

        let cube = file.validate().unwrap();
        assert_eq!(cube.attribute_names(), &["c.region", "p.category", "d.year"]);
        assert_eq!(
            cube.measure_labels(),
            vec!["sum_quantity", "total_sales", "total_cost", "count", "avg_unit_price"]
        );
        assert_eq!(
            cube.measure_types(),
            vec![
                DataType::Int,
                DataType::Float,
                DataType::Float,
                DataType::Int,
                DataType::Float,
            ]
        );
        assert_eq!(cube.grouping_sets().len(), 8);
    }

    #[test]
    fn test_defaults() {
        let file = with_cube(r#"group_by = ["region"]"#);
        assert_eq!(file.name(), "cube");
        assert_eq!(file.source.data_dir, "data");
        assert_eq!(file.output.dir, "outputs");
        assert_eq!(file.output.preview_rows, 10);
        assert!(file.engine.parallel);
        assert!(file.cube.spec.measures.is_empty());
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_data_dir_override_and_env() {
        env::set_var("STARCUBE_SETTINGS_TEST_DATA", "/srv/warehouse");
        let file = CubeFile::from_toml(&format!(
            "[source]\ndata_dir = \"${{STARCUBE_SETTINGS_TEST_DATA}}/csv\"\n{}",
            BASE_TABLES
        ))
        .unwrap();

        assert_eq!(
            file.data_dir(None).unwrap(),
            PathBuf::from("/srv/warehouse/csv")
        );
        assert_eq!(
            file.data_dir(Some(Path::new("elsewhere"))).unwrap(),
            PathBuf::from("elsewhere")
        );
    }

    #[test]
    fn test_missing_env_var() {
        let file = CubeFile::from_toml("[source]\ndata_dir = \"${STARCUBE_SETTINGS_TEST_UNSET}\"")
            .unwrap();
        assert!(matches!(
            file.data_dir(None),
            Err(SettingsError::MissingEnvVar(name)) if name == "STARCUBE_SETTINGS_TEST_UNSET"
        ));
    }

    #[test]
    fn test_unknown_table() {
        let file = CubeFile::from_toml(
            r#"
[tables.fact]
columns = [{ name = "id", type = "int" }]

[star]
fact = "fact"
dimensions = [{ table = "dim_missing", key = "id", foreign_key = "id" }]
"#,
        )
        .unwrap();
        assert!(matches!(
            file.validate(),
            Err(SettingsError::UnknownTable(name)) if name == "dim_missing"
        ));
    }

    #[test]
    fn test_missing_fact() {
        let file = CubeFile::from_toml("[cube]\ngroup_by = []").unwrap();
        assert!(matches!(
            file.validate(),
            Err(SettingsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_attribute() {
        let file = with_cube(r#"group_by = ["region", "year"]"#);
        assert!(matches!(
            file.validate(),
            Err(SettingsError::Cube(CubeError::Attribute(LookupError::Unknown(name)))) if name == "year"
        ));
    }

    #[test]
    fn test_ambiguous_bare_name() {
        let file = with_cube(r#"group_by = ["customer_id"]"#);
        assert!(matches!(
            file.validate(),
            Err(SettingsError::Cube(CubeError::Attribute(LookupError::Ambiguous { .. })))
        ));

        let file = with_cube(r#"group_by = ["dim_customer.customer_id"]"#);
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_sum_of_text_rejected() {
        let file = with_cube(
            r#"
group_by = ["region"]
measures = [{ function = "sum", column = "note" }]
"#,
        );
        assert_eq!(
            file.validate().unwrap_err().to_string(),
            CubeError::UnsupportedAggregate {
                function: AggregateFunction::Sum,
                column: "fact.note".to_string(),
                data_type: DataType::Text,
            }
            .to_string()
        );
    }

    #[test]
    fn test_key_type_mismatch() {
        let file = CubeFile::from_toml(
            r#"
[tables.fact]
columns = [{ name = "customer_id", type = "text" }]

[tables.dim_customer]
columns = [{ name = "customer_id", type = "int" }]

[star]
fact = "fact"
dimensions = [{ table = "dim_customer", key = "customer_id", foreign_key = "customer_id" }]
"#,
        )
        .unwrap();
        assert!(matches!(
            file.validate(),
            Err(SettingsError::Join(JoinError::KeyTypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_derived_formula_errors() {
        let unparsable = CubeFile::from_toml(
            r#"
[tables.fact]
columns = [{ name = "quantity", type = "int" }]
derived = [{ name = "big", expr = "quantity >" }]
"#,
        );
        assert!(matches!(unparsable, Err(SettingsError::ParseError(_))));

        let unknown = CubeFile::from_toml(
            r#"
[tables.fact]
columns = [{ name = "quantity", type = "int" }]
derived = [{ name = "amount", expr = "quantity * price" }]

[star]
fact = "fact"
"#,
        )
        .unwrap();
        assert!(matches!(
            unknown.validate(),
            Err(SettingsError::Schema(CoerceError::InvalidDerived {
                source: ExprError::UnknownColumn(_),
                ..
            }))
        ));
    }

    #[test]
    fn test_load_from_env() {
        env::remove_var(CONFIG_ENV_VAR);
        assert!(matches!(CubeFile::load(None), Err(SettingsError::NoConfig)));

        env::set_var(CONFIG_ENV_VAR, demo_file());
        let file = CubeFile::load(None).unwrap();
        assert_eq!(file.path.as_deref(), Some(demo_file().as_path()));

        // the CLI resolves its cube file the same way, variables included
        env::set_var("STARCUBE_SETTINGS_TEST_ROOT", env!("CARGO_MANIFEST_DIR"));
        env::set_var(
            CONFIG_ENV_VAR,
            "${STARCUBE_SETTINGS_TEST_ROOT}/demos/sample_schema/cube.toml",
        );
        assert_eq!(CubeFile::resolve_path(None).unwrap(), demo_file());
        assert_eq!(
            CubeFile::resolve_path(Some(Path::new("other.toml"))).unwrap(),
            PathBuf::from("other.toml")
        );
        let file = CubeFile::load(None).unwrap();
        assert_eq!(file.name(), "sales_cube");
        env::remove_var(CONFIG_ENV_VAR);

        assert!(matches!(
            CubeFile::load(Some(Path::new("no/such/cube.toml"))),
            Err(SettingsError::FileNotFound(_))
        ));
    }
}
