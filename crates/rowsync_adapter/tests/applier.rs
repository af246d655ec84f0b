//! Batch applier tests against a scripted connection.

use proptest::prelude::*;
use rowsync_adapter::{
    AdapterError, BatchApplier, CommandCache, DriverError, Parameter, ParameterDirection,
};
use rowsync_codec::{NativeValue, Value, WireType};
use rowsync_core::{RowState, SyncError, SyncStage, SyncTable};
use rowsync_testkit::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

const BULK_UPDATE: &str = "[dbo].[Product_BulkUpdate]";

fn applier(conn: ScriptedConnection) -> BatchApplier<ScriptedConnection> {
    init_tracing();
    BatchApplier::new(product_schema(), conn, Arc::new(CommandCache::new()))
}

fn failed_table() -> SyncTable {
    SyncTable::new(product_schema())
}

#[test]
fn one_bulk_call_carries_every_record() {
    let mut applier = applier(ScriptedConnection::new());
    let context = apply_context(1_042);
    let rows = vec![
        product_row(42, "19.99", RowState::Modified),
        product_row(43, "5", RowState::Added),
    ];
    let mut failed = failed_table();

    applier.apply(BULK_UPDATE, &rows, &mut failed, &context).unwrap();

    let conn = applier.connection();
    let calls = conn.bulk_calls();
    assert_eq!(calls.len(), 1);
    let bulk = calls[0];
    assert_eq!(bulk.scope_id, context.session_id());
    assert_eq!(bulk.min_timestamp, 1_042);
    assert_eq!(bulk.columns[0].wire_type, WireType::Int);
    assert_eq!(bulk.columns[1].wire_type, WireType::Decimal);
    assert_eq!(
        bulk.records[0],
        vec![
            NativeValue::Int(42),
            NativeValue::Decimal(Decimal::from_str("19.99").unwrap())
        ]
    );
    assert_eq!(bulk.records[1][0], NativeValue::Int(43));
    assert!(failed.is_empty());
}

#[test]
fn empty_batch_touches_nothing() {
    let mut applier = applier(ScriptedConnection::new());
    let mut failed = failed_table();

    applier
        .apply(BULK_UPDATE, &[], &mut failed, &apply_context(0))
        .unwrap();

    assert!(applier.connection().events().is_empty());
    assert!(failed.is_empty());
}

#[test]
fn refused_rows_keep_engine_order_and_input_state() {
    let conn = ScriptedConnection::new().with_rejected(vec![
        vec![Value::Integer(3), decimal("3.00")],
        vec![Value::Integer(1), decimal("1.00")],
    ]);
    let mut applier = applier(conn);
    let rows = vec![
        product_row(1, "1.00", RowState::Deleted),
        product_row(2, "2.00", RowState::Modified),
        product_row(3, "3.00", RowState::Added),
    ];
    let mut failed = failed_table();

    applier
        .apply(BULK_UPDATE, &rows, &mut failed, &apply_context(7))
        .unwrap();

    assert_eq!(failed.len(), 2);
    assert_eq!(failed.rows()[0].state(), RowState::Added);
    assert_eq!(failed.rows()[0].values()[0], Value::Integer(3));
    assert_eq!(failed.rows()[1].state(), RowState::Deleted);
    assert_eq!(failed.rows()[0].values(), rows[2].values());
    assert_eq!(failed.rows()[1].values(), rows[0].values());
}

#[test]
fn unmatched_refused_row_takes_batch_state() {
    let conn = ScriptedConnection::new().with_rejected(vec![vec![Value::Integer(99), Value::Null]]);
    let mut applier = applier(conn);
    let rows = vec![
        product_row(1, "1.00", RowState::Added),
        product_row(2, "2.00", RowState::Modified),
    ];
    let mut failed = failed_table();

    applier
        .apply(BULK_UPDATE, &rows, &mut failed, &apply_context(7))
        .unwrap();

    assert_eq!(failed.rows()[0].state(), RowState::Modified);
    assert_eq!(failed.rows()[0].values(), &[Value::Integer(99), Value::Null]);
}

#[test]
fn bad_cell_aborts_before_the_engine() {
    let mut applier = applier(ScriptedConnection::new());
    let rows = vec![
        product_row(42, "19.99", RowState::Modified),
        product_row(43, "abc", RowState::Modified),
    ];
    let mut failed = failed_table();

    let err = applier
        .apply(BULK_UPDATE, &rows, &mut failed, &apply_context(0))
        .unwrap_err();

    match &err {
        AdapterError::RecordBuild { table, source } => {
            assert_eq!(table, "dbo.Product");
            assert_eq!(source.target(), Some(WireType::Decimal));
            assert!(source.to_string().contains("Price"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(applier.connection().events().is_empty());
    assert!(failed.is_empty());
}

#[test]
fn row_with_wrong_arity_is_rejected() {
    let mut applier = applier(ScriptedConnection::new());
    let rows = vec![rowsync_core::Row::new(
        RowState::Added,
        vec![Value::Integer(1)],
    )];
    let mut failed = failed_table();

    let err = applier
        .apply(BULK_UPDATE, &rows, &mut failed, &apply_context(0))
        .unwrap_err();
    assert!(matches!(
        err,
        AdapterError::RowShape {
            index: 0,
            expected: 2,
            actual: 1,
            ..
        }
    ));
}

#[test]
fn closed_connection_is_opened_and_closed_once() {
    let mut applier = applier(ScriptedConnection::new());
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    applier
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap();

    let conn = applier.connection();
    assert_eq!(conn.opens(), 1);
    assert_eq!(conn.closes(), 1);
    assert!(!rowsync_adapter::Connection::is_open(conn));
}

#[test]
fn caller_opened_connection_stays_open() {
    let mut applier = applier(ScriptedConnection::new().with_transaction());
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    applier
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap();

    let conn = applier.connection();
    assert_eq!(conn.opens(), 0);
    assert_eq!(conn.closes(), 0);
    assert!(conn.bulk_calls()[0].ambient_transaction);
}

#[test]
fn engine_failure_still_closes_and_converts() {
    let conn = ScriptedConnection::new().with_bulk_failure(DriverError::statement(
        547,
        "The MERGE statement conflicted with a FOREIGN KEY constraint",
    ));
    let mut applier = applier(conn);
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    let err = applier
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap_err();
    assert!(err.is_driver());
    assert_eq!(applier.connection().closes(), 1);

    let sync = SyncError::from(err);
    assert_eq!(sync.number, 547);
    assert_eq!(sync.stage, SyncStage::ChangesApplying);
    assert_eq!(sync.data_source.as_deref(), Some("scripted"));
    assert_eq!(sync.initial_catalog.as_deref(), Some("memory"));
}

#[test]
fn close_failure_does_not_mask_success() {
    let conn = ScriptedConnection::new().with_close_failure(DriverError::connection("reset"));
    let mut applier = applier(conn);
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    applier
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap();
    assert_eq!(applier.connection().closes(), 1);
}

#[test]
fn parameters_are_derived_once_per_cache() {
    let cache = Arc::new(CommandCache::new());
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    let mut first = BatchApplier::new(product_schema(), ScriptedConnection::new(), Arc::clone(&cache));
    first
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap();
    first
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(1))
        .unwrap();

    let mut second = BatchApplier::new(product_schema(), ScriptedConnection::new(), Arc::clone(&cache));
    second
        .apply("dbo.product_bulkupdate", &rows, &mut failed_table(), &apply_context(2))
        .unwrap();

    assert_eq!(first.connection().derivations(), 1);
    assert_eq!(second.connection().derivations(), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn set_command_parameters_maps_columns_and_drops_return_value() {
    let conn = ScriptedConnection::new().with_parameters(vec![
        Parameter::new("@RETURN_VALUE").with_direction(ParameterDirection::ReturnValue),
        Parameter::new("@id"),
        Parameter::new("@PRICE"),
        Parameter::new("@sync_scope_id"),
    ]);
    let mut applier = applier(conn);

    let parameters = applier.set_command_parameters("[dbo].[Product_Update]").unwrap();

    let names: Vec<_> = parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["@id", "@PRICE", "@sync_scope_id"]);
    assert_eq!(parameters[0].source_column.as_deref(), Some("Id"));
    assert_eq!(parameters[1].source_column.as_deref(), Some("Price"));
    assert_eq!(parameters[2].source_column, None);
    assert_eq!(applier.connection().opens(), 1);
    assert_eq!(applier.connection().closes(), 1);
}

#[test]
fn unknown_parameter_fails_before_execution() {
    let conn = ScriptedConnection::new().with_parameters(vec![Parameter::new("@color")]);
    let mut applier = applier(conn);
    let rows = vec![product_row(1, "1.00", RowState::Added)];

    let err = applier
        .apply(BULK_UPDATE, &rows, &mut failed_table(), &apply_context(0))
        .unwrap_err();
    assert!(matches!(err, AdapterError::MissingParameter { .. }));
    assert!(applier.connection().bulk_calls().is_empty());
    assert_eq!(applier.connection().closes(), 1);
}

proptest! {
    #[test]
    fn any_valid_batch_is_one_bulk_call(rows in arb_product_batch(32)) {
        let mut applier = applier(ScriptedConnection::new());
        let mut failed = failed_table();

        applier.apply(BULK_UPDATE, &rows, &mut failed, &apply_context(0)).unwrap();

        let calls = applier.connection().bulk_calls();
        prop_assert_eq!(calls.len(), 1);
        prop_assert_eq!(calls[0].records.len(), rows.len());
        prop_assert!(failed.is_empty());
    }
}
