//! Simulated static-data providers
//!
//! Fixed scheme and cooperative listings plus a mock ledger transaction. None
//! of these touch the AI gateway.

use rand::RngExt;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Scheme {
    pub name: &'static str,
    pub description: &'static str,
    pub link: &'static str,
}

/// Self-help group or farmer producer organisation.
#[derive(Debug, Clone, Serialize)]
pub struct Cooperative {
    pub name: &'static str,
    pub location: &'static str,
    pub specialty: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerTx {
    pub tx_hash: String,
    pub status: &'static str,
}

pub fn govt_schemes() -> Vec<Scheme> {
    vec![
        Scheme {
            name: "PM-KISAN Scheme",
            description: "Provides income support to all landholding farmer families.",
            link: "#",
        },
        Scheme {
            name: "Shree Anna Scheme",
            description: "Promotes millet cultivation, procurement, and value-addition.",
            link: "#",
        },
    ]
}

pub fn shg_fpo_directory() -> Vec<Cooperative> {
    vec![
        Cooperative {
            name: "Annapurna SHG",
            location: "Wardha, Maharashtra",
            specialty: "Jowar Processing",
        },
        Cooperative {
            name: "Sahyadri FPO",
            location: "Chikkamagaluru, Karnataka",
            specialty: "Organic Ragi",
        },
    ]
}

/// Mock confirmed transaction with a random 32-byte hash.
pub fn dummy_ledger_tx() -> LedgerTx {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    LedgerTx {
        tx_hash: format!("0x{hex}"),
        status: "Confirmed",
    }
}
