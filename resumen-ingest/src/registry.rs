//! Bank registry: a closed set of banks dispatched to their parsers.

use std::fmt;
use std::str::FromStr;

use resumen_core::{InputKind, Section, StatementError, StatementInput};
use serde::Serialize;
use tracing::debug;

use crate::parsers::banco_macro::MacroParser;
use crate::parsers::bbva::BbvaParser;
use crate::parsers::bpn::BpnParser;
use crate::parsers::comafi::ComafiParser;
use crate::parsers::credicoop::CredicoopParser;
use crate::parsers::galicia::GaliciaParser;
use crate::parsers::hsbc::HsbcParser;
use crate::parsers::icbc::IcbcParser;
use crate::parsers::mercadopago::MercadoPagoParser;
use crate::parsers::nacion::NacionParser;
use crate::parsers::patagonia::PatagoniaParser;
use crate::parsers::roela::RoelaParser;
use crate::parsers::santander::SantanderParser;
use crate::parsers::supervielle::SupervielleParser;
use crate::parsers::{StatementParser, fold};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bank {
    Bbva,
    Bpn,
    Comafi,
    Credicoop,
    Galicia,
    Hsbc,
    Icbc,
    Macro,
    MercadoPago,
    Nacion,
    Patagonia,
    Roela,
    Santander,
    Supervielle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
    Supported,
    /// Parses the layouts seen so far; less field-tested.
    Experimental,
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => f.pad("supported"),
            Self::Experimental => f.pad("experimental"),
        }
    }
}

impl Bank {
    pub const ALL: [Bank; 14] = [
        Bank::Bbva,
        Bank::Bpn,
        Bank::Comafi,
        Bank::Credicoop,
        Bank::Galicia,
        Bank::Hsbc,
        Bank::Icbc,
        Bank::Macro,
        Bank::MercadoPago,
        Bank::Nacion,
        Bank::Patagonia,
        Bank::Roela,
        Bank::Santander,
        Bank::Supervielle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Bbva => BbvaParser::BANK,
            Self::Bpn => BpnParser::BANK,
            Self::Comafi => ComafiParser::BANK,
            Self::Credicoop => CredicoopParser::BANK,
            Self::Galicia => GaliciaParser::BANK,
            Self::Hsbc => HsbcParser::BANK,
            Self::Icbc => IcbcParser::BANK,
            Self::Macro => MacroParser::BANK,
            Self::MercadoPago => MercadoPagoParser::BANK,
            Self::Nacion => NacionParser::BANK,
            Self::Patagonia => PatagoniaParser::BANK,
            Self::Roela => RoelaParser::BANK,
            Self::Santander => SantanderParser::BANK,
            Self::Supervielle => SupervielleParser::BANK,
        }
    }

    pub fn status(self) -> SupportStatus {
        match self {
            Self::Comafi | Self::Credicoop | Self::Icbc | Self::Macro | Self::MercadoPago | Self::Patagonia => {
                SupportStatus::Experimental
            }
            _ => SupportStatus::Supported,
        }
    }

    pub fn handle(self) -> ParserHandle {
        let input = match self {
            Self::Bbva => BbvaParser::default().input_kind(),
            Self::Bpn => BpnParser::default().input_kind(),
            Self::Comafi => ComafiParser::default().input_kind(),
            Self::Credicoop => CredicoopParser::default().input_kind(),
            Self::Galicia => GaliciaParser::default().input_kind(),
            Self::Hsbc => HsbcParser::default().input_kind(),
            Self::Icbc => IcbcParser::default().input_kind(),
            Self::Macro => MacroParser::default().input_kind(),
            Self::MercadoPago => MercadoPagoParser.input_kind(),
            Self::Nacion => NacionParser::default().input_kind(),
            Self::Patagonia => PatagoniaParser::default().input_kind(),
            Self::Roela => RoelaParser::default().input_kind(),
            Self::Santander => SantanderParser::default().input_kind(),
            Self::Supervielle => SupervielleParser::default().input_kind(),
        };
        ParserHandle {
            bank: self,
            input,
            status: self.status(),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Bank {
    type Err = StatementError;

    /// Case, accent and space insensitive: `"nacion"`, `"Mercado Pago"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = fold(s).split_whitespace().collect();
        Self::ALL
            .into_iter()
            .find(|bank| fold(bank.name()) == key)
            .ok_or_else(|| StatementError::UnknownBank(s.to_string()))
    }
}

/// What the registry knows about one bank's parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParserHandle {
    pub bank: Bank,
    /// Input shape the parser expects from extraction.
    pub input: InputKind,
    pub status: SupportStatus,
}

impl ParserHandle {
    /// Parse one document with the bank's default parser configuration.
    pub fn parse(&self, input: &StatementInput) -> Result<Vec<Section>, StatementError> {
        debug!(bank = %self.bank, input = %input.kind(), "parsing statement");
        match self.bank {
            Bank::Bbva => BbvaParser::default().parse(input),
            Bank::Bpn => BpnParser::default().parse(input),
            Bank::Comafi => ComafiParser::default().parse(input),
            Bank::Credicoop => CredicoopParser::default().parse(input),
            Bank::Galicia => GaliciaParser::default().parse(input),
            Bank::Hsbc => HsbcParser::default().parse(input),
            Bank::Icbc => IcbcParser::default().parse(input),
            Bank::Macro => MacroParser::default().parse(input),
            Bank::MercadoPago => MercadoPagoParser.parse(input),
            Bank::Nacion => NacionParser::default().parse(input),
            Bank::Patagonia => PatagoniaParser::default().parse(input),
            Bank::Roela => RoelaParser::default().parse(input),
            Bank::Santander => SantanderParser::default().parse(input),
            Bank::Supervielle => SupervielleParser::default().parse(input),
        }
    }
}

pub fn resolve_parser(bank_id: &str) -> Result<ParserHandle, StatementError> {
    Ok(bank_id.parse::<Bank>()?.handle())
}

pub fn list_supported_banks() -> Vec<ParserHandle> {
    Bank::ALL.into_iter().map(Bank::handle).collect()
}

/// Parse one document: one canonical section per account found.
pub fn parse_statement(bank_id: &str, input: &StatementInput) -> Result<Vec<Section>, StatementError> {
    resolve_parser(bank_id)?.parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_from_str_folds_case_and_accents() {
        assert_eq!("Nación".parse::<Bank>().unwrap(), Bank::Nacion);
        assert_eq!("nacion".parse::<Bank>().unwrap(), Bank::Nacion);
        assert_eq!("Mercado Pago".parse::<Bank>().unwrap(), Bank::MercadoPago);
        assert_eq!("hsbc".parse::<Bank>().unwrap(), Bank::Hsbc);
    }

    #[test]
    fn test_unknown_bank() {
        let err = resolve_parser("Unknown").unwrap_err();
        assert!(matches!(err, StatementError::UnknownBank(ref id) if id == "Unknown"));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for bank in Bank::ALL {
            assert_eq!(bank.to_string().parse::<Bank>().unwrap(), bank);
        }
    }

    #[test]
    fn test_list_supported_banks() {
        let banks = list_supported_banks();
        assert_eq!(banks.len(), 14);

        let galicia = banks.iter().find(|h| h.bank == Bank::Galicia).unwrap();
        assert_eq!(galicia.input, InputKind::TableCells);
        assert_eq!(galicia.status, SupportStatus::Supported);

        let macro_handle = banks.iter().find(|h| h.bank == Bank::Macro).unwrap();
        assert_eq!(macro_handle.input, InputKind::Fragments);
        assert_eq!(macro_handle.status, SupportStatus::Experimental);
    }

    #[test]
    fn test_handle_rejects_wrong_input_shape() {
        let err = Bank::Bbva
            .handle()
            .parse(&StatementInput::pages(["Fecha Concepto"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::UnsupportedInput { .. }));
    }
}
