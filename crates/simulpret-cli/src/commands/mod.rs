pub mod loan;
pub mod planning;
pub mod rates;
pub mod risk;
