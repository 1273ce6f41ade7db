use resumen_core::{
    BankRecord, CanonicalTransaction, Section, Side, StatementError, StatementInput, TableCell,
    check_continuity, classify, format_amount, parse_amount,
};
use resumen_ingest::{Bank, parse_statement};
use rust_decimal_macros::dec;

fn credicoop_row(fecha: &str, combte: &str, desc: &str, debito: &str, credito: &str, saldo: &str) -> String {
    format!("{fecha:<9}{combte:<7}{desc:<41}{debito:>17}{credito:>18}{saldo:>17}")
}

const NACION: &str = r#"BANCO DE LA NACION ARGENTINA
FECHA MOVIMIENTOS COMPROB. DEBITOS CREDITOS SALDO
SALDO ANTERIOR 361.876,60
28/05/24 TRANSF. RECIBIDA 4455123 15.000,00 376.876,60
29/05/24 PAGO TARJETA 998877 15.000,00 361.876,60
SALDO FINAL 361.876,60
"#;

const SUPERVIELLE_TWO_ACCOUNTS: &str = r#"CUENTA CORRIENTE EN PESOS Nro 01-12345/6
Saldo del período anterior 10.000,00
02/05/24 Transferencia recibida R 1234 5.000,00 15.000,00
03/05/24 Pago servicio 123456** 2.000,00 13.000,00
SALDO PERIODO ACTUAL 13.000,00
CAJA DE AHORRO EN PESOS Nro 02-55555/1
Saldo del período anterior 500,00
06/05/24 Deposito efectivo 3.000,00 3.500,00
07/05/24 Extraccion cajero 1.000,00 2.500,00
SALDO PERIODO ACTUAL 2.500,00
"#;

fn galicia_cells() -> StatementInput {
    let rows: [&[&str]; 4] = [
        &["Fecha", "Descripción", "Origen", "Crédito", "Débito", "Saldo"],
        &["01/03/24", "TRANSFERENCIA DE TERCEROS", "", "150.000,00", "", "1.150.000,00"],
        &["", "PEREZ JUAN", "", "", "", ""],
        &["02/03/24", "PAGO VISA", "", "", "-50.000,00", "1.100.000,00"],
    ];
    let cells = rows
        .iter()
        .enumerate()
        .flat_map(|(r, texts)| {
            texts
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.is_empty())
                .map(move |(c, t)| TableCell::new(r as u32, c as u32, *t))
        })
        .collect();
    StatementInput::Cells(cells)
}

fn sample_statements() -> Vec<(&'static str, StatementInput)> {
    vec![
        ("Nación", StatementInput::pages([NACION])),
        ("Supervielle", StatementInput::pages([SUPERVIELLE_TWO_ACCOUNTS])),
        ("Galicia", galicia_cells()),
    ]
}

#[test]
fn test_scenario_opening_balance_on_next_line() {
    let text = [
        "SALDO ANTERIOR".to_string(),
        "2.246.170,50".to_string(),
        credicoop_row("03/01/23", "0012745", "Impuesto ley 25413", "0,89", "", ""),
    ]
    .join("\n");
    let sections = parse_statement("Credicoop", &StatementInput::pages([text])).unwrap();
    let rows = &sections[0];

    assert_eq!(rows[0].fecha, "");
    assert_eq!(rows[0].detalle, "SALDO ANTERIOR");
    assert_eq!(rows[0].saldo, Some(dec!(2246170.50)));
    assert_eq!(rows[1].debitos, Some(dec!(0.89)));
    assert_eq!(rows[1].creditos, None);
}

#[test]
fn test_scenario_amount_codec() {
    let value = parse_amount("31.430,00").unwrap();
    assert_eq!(value, dec!(31430.00));
    assert_eq!(format_amount(value), "31.430,00");
    assert_eq!(parse_amount("99.918,00-").unwrap(), dec!(-99918.00));
}

#[test]
fn test_scenario_classify_debit() {
    assert_eq!(
        classify(dec!(249782.95), dec!(20000.00), dec!(229782.95)),
        Some(Side::Debit)
    );
}

#[test]
fn test_scenario_unknown_bank() {
    let err = parse_statement("Unknown", &StatementInput::pages([NACION])).unwrap_err();
    assert_eq!(err, StatementError::UnknownBank("Unknown".to_string()));
}

#[test]
fn test_debit_and_credit_are_exclusive() {
    for (bank, input) in sample_statements() {
        let sections = parse_statement(bank, &input).unwrap();
        for txn in sections.iter().flatten() {
            assert!(!txn.has_both_sides(), "{bank}: {txn:?}");
        }
    }
}

#[test]
fn test_balances_are_continuous() {
    for (bank, input) in sample_statements() {
        let sections = parse_statement(bank, &input).unwrap();
        for section in &sections {
            assert_eq!(check_continuity(section), None, "{bank}");
        }
    }
}

#[test]
fn test_canonicalize_is_identity_on_canonical_rows() {
    let sections = parse_statement("Nación", &StatementInput::pages([NACION])).unwrap();
    let rows: &Section = &sections[0];
    assert_eq!(&CanonicalTransaction::canonicalize(rows).unwrap(), rows);
}

#[test]
fn test_accounts_are_isolated_sections() {
    let sections = parse_statement(
        Bank::Supervielle.name(),
        &StatementInput::pages([SUPERVIELLE_TWO_ACCOUNTS]),
    )
    .unwrap();
    assert_eq!(sections.len(), 2);
    assert!(sections.iter().all(|s| !s.is_empty()));

    assert_eq!(sections[0].last().unwrap().saldo, Some(dec!(13000.00)));
    assert_eq!(sections[1][0].saldo, Some(dec!(500.00)));
    assert_eq!(sections[1][2].debitos, Some(dec!(1000.00)));
}

#[test]
fn test_canonical_rows_serialize_with_column_names() {
    let sections = parse_statement("Nación", &StatementInput::pages([NACION])).unwrap();
    let json = serde_json::to_value(&sections[0][1]).unwrap();
    assert_eq!(json["FECHA"], "28/05/24");
    assert_eq!(json["CREDITOS"], "15000.00");
    assert!(json["DEBITOS"].is_null());
}
