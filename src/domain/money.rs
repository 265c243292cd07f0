/// Money is represented as integer minor currency units to avoid
/// floating-point precision issues. For EUR/USD, 1 unit = 100 cents,
/// so €50.00 = 5000 cents.
///
/// Balances and transaction amounts are both denominated in `Cents`;
/// the ledger never stores a fractional value.
pub type Cents = i64;
