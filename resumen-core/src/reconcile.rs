//! Running-balance reconciliation.
//!
//! One `RunningBalance` lives for the duration of a single parse call. It is
//! used three ways: validate a printed balance, fill in a missing one, or infer
//! whether an undifferentiated amount was a debit or a credit.

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{Mismatch, StatementError};

/// One cent. Every balance comparison goes through [`within_tolerance`].
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Debit,
    Credit,
}

/// Which side of the ledger `amount` sits on, given the balances around it.
/// Credit is tested first.
pub fn classify(previous: Decimal, amount: Decimal, current: Decimal) -> Option<Side> {
    if within_tolerance(previous + amount, current) {
        Some(Side::Credit)
    } else if within_tolerance(previous - amount, current) {
        Some(Side::Debit)
    } else {
        None
    }
}

/// What to do with an amount that [`classify`] cannot place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferencePolicy {
    /// Abort the document with a reconciliation error.
    Strict,
    /// Leave both amount columns empty and keep going.
    Lenient,
    /// Credit if the balance went up, debit if it went down, neither if flat.
    BalanceDirection,
}

/// Whether printed balances are checked against the running sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    Validate,
    Trust,
}

/// Debit and credit columns of one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Movement {
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl Movement {
    pub fn debit(amount: Decimal) -> Self {
        Self {
            debit: Some(amount),
            credit: None,
        }
    }

    pub fn credit(amount: Decimal) -> Self {
        Self {
            debit: None,
            credit: Some(amount),
        }
    }

    /// Place a signed amount: negative is a debit of its magnitude.
    pub fn signed(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::debit(amount.abs())
        } else {
            Self::credit(amount)
        }
    }

    pub fn from_side(side: Side, amount: Decimal) -> Self {
        match side {
            Side::Debit => Self::debit(amount),
            Side::Credit => Self::credit(amount),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.debit.is_none() && self.credit.is_none()
    }

    /// Net effect on the balance.
    pub fn net(&self) -> Decimal {
        self.credit.unwrap_or_default() - self.debit.unwrap_or_default()
    }
}

/// Where a transaction came from, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    pub bank: &'a str,
    pub date: &'a str,
    pub line: &'a str,
}

impl EntryContext<'_> {
    pub fn error(&self, mismatch: Mismatch) -> StatementError {
        StatementError::Reconciliation {
            bank: self.bank.to_string(),
            date: self.date.to_string(),
            line: self.line.to_string(),
            mismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningBalance {
    current: Option<Decimal>,
}

impl RunningBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opening(balance: Decimal) -> Self {
        Self {
            current: Some(balance),
        }
    }

    pub fn current(&self) -> Option<Decimal> {
        self.current
    }

    /// Reset at an opening-balance marker.
    pub fn set(&mut self, balance: Decimal) {
        self.current = Some(balance);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Apply a movement with known sides. Returns the balance to record: the
    /// printed one when present, otherwise the computed one (when a previous
    /// balance is known).
    ///
    /// Under `Validate` a printed balance that disagrees with the running sum
    /// is an error. Under `Trust` the printed balance simply replaces it.
    pub fn post(
        &mut self,
        movement: Movement,
        printed: Option<Decimal>,
        mode: ReconcileMode,
        ctx: EntryContext<'_>,
    ) -> Result<Option<Decimal>, StatementError> {
        let computed = self.current.map(|prev| prev + movement.net());
        if let (ReconcileMode::Validate, Some(printed), Some(computed)) = (mode, printed, computed) {
            if !within_tolerance(printed, computed) {
                return Err(ctx.error(Mismatch::Balance { printed, computed }));
            }
        }
        self.current = printed.or(computed);
        Ok(self.current)
    }

    /// Decide the side of an undifferentiated `amount` from the printed
    /// balance that follows it, then move the running balance there.
    ///
    /// A printed sign on `amount` is ignored; only its magnitude is placed.
    pub fn infer(
        &mut self,
        amount: Decimal,
        printed: Decimal,
        policy: InferencePolicy,
        ctx: EntryContext<'_>,
    ) -> Result<Movement, StatementError> {
        let amount = amount.abs();
        let previous = self.current;
        let side = previous.and_then(|prev| classify(prev, amount, printed));

        let movement = match (side, policy) {
            (Some(side), _) => Movement::from_side(side, amount),
            (None, InferencePolicy::Strict) => {
                return Err(ctx.error(Mismatch::Unclassifiable {
                    previous,
                    amount,
                    printed,
                }));
            }
            (None, InferencePolicy::Lenient) => {
                warn!(
                    bank = ctx.bank,
                    date = ctx.date,
                    %amount,
                    %printed,
                    "amount does not reconcile with the running balance; leaving it unclassified"
                );
                Movement::default()
            }
            (None, InferencePolicy::BalanceDirection) => match previous {
                Some(prev) if printed > prev => Movement::credit(amount),
                Some(prev) if printed < prev => Movement::debit(amount),
                _ => Movement::default(),
            },
        };

        self.current = Some(printed);
        Ok(movement)
    }
}
