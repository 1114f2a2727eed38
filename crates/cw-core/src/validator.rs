use crate::catalog::ChainCatalog;
use crate::error::ChainError;
use crate::model::{ChainRecord, Protocol, Table};

/// Validates a desired chain resource against netfilter's table/chain rules
pub struct ChainValidator<'a> {
    record: &'a ChainRecord,
}

impl<'a> ChainValidator<'a> {
    pub fn new(record: &'a ChainRecord) -> Self {
        Self { record }
    }

    /// Run all validations, stopping at the first violation
    pub fn validate(&self) -> Result<(), ChainError> {
        self.check_table_chain()?;
        self.check_policy()?;
        Ok(())
    }

    /// Reject kernel chain names used in a table that does not provide them
    fn check_table_chain(&self) -> Result<(), ChainError> {
        let chain = self.record.chain();
        let table = self.record.table();

        if table == Table::Broute {
            if self.record.protocol() != Protocol::Ethernet {
                return Err(ChainError::BrouteProtocol);
            }
            if chain != "BROUTING" {
                return Err(ChainError::BrouteChain);
            }
            return Ok(());
        }

        // Custom chain names are free to use in any table.
        if !ChainCatalog::is_reserved(chain)
            || ChainCatalog::is_inbuilt(table, Protocol::IPv4, chain)
        {
            return Ok(());
        }

        Err(match table {
            Table::Filter | Table::Security => ChainError::FilterChain(table.to_string()),
            Table::Mangle => ChainError::MangleChain,
            Table::Nat => ChainError::NatChain,
            Table::Raw => ChainError::RawChain,
            Table::Broute => ChainError::BrouteChain,
        })
    }

    /// A policy only makes sense on an inbuilt chain
    fn check_policy(&self) -> Result<(), ChainError> {
        if self.record.policy.is_some() && !self.record.is_inbuilt() {
            return Err(ChainError::PolicyOnCustomChain(self.record.name.to_string()));
        }
        Ok(())
    }
}

/// Validate a desired chain before it is created or updated.
pub fn verify(should: &ChainRecord) -> Result<(), ChainError> {
    ChainValidator::new(should).validate()
}
