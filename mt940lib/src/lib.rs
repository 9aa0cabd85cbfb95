//! mt940lib — сборка выписок MT940 (.sta) из CSV-выгрузок по кредитным картам.

pub mod assemble;
pub mod balance;
pub mod error;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod traits;

pub mod formats {
    pub mod csv;
    pub mod mt940;
}
