//! Shared test harness modules for the CNPJ CLI.

use super::*;

mod helpers;
