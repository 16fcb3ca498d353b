//! In-memory ledger used for dry runs.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use sha2::{Digest, Sha256};

use super::{Actor, CodeId, ContractAddress, Gateway, GatewayError, Receipt};
use crate::payload::Message;

/// First code id handed out for uploads that were not pre-registered.
const FIRST_CODE_ID: u64 = 1;

#[derive(Debug, Clone)]
struct ContractRecord {
    code_id: CodeId,
    admin: Option<String>,
}

#[derive(Debug, Default)]
struct Ledger {
    codes: BTreeMap<CodeId, String>,
    contracts: BTreeMap<ContractAddress, ContractRecord>,
    instance_count: u64,
    tx_count: u64,
}

impl Ledger {
    fn next_code_id(&self) -> CodeId {
        let last = self.codes.keys().next_back().map(|id| id.get()).unwrap_or(0);
        CodeId::new(last.max(FIRST_CODE_ID - 1) + 1)
    }

    fn receipt(&mut self, kind: &str) -> Receipt {
        self.tx_count += 1;
        let digest = Sha256::digest(format!("{kind}:{}", self.tx_count).as_bytes());
        Receipt {
            tx_hash: hex::encode_upper(digest),
            gas_used: 0,
        }
    }
}

/// Gateway that simulates the ledger without any network traffic.
///
/// It applies the same admission rules a real chain would: instantiating
/// unknown code, executing on an unknown address and migrating without being
/// the contract admin are all rejected.
#[derive(Debug)]
pub struct DryRunGateway {
    address_prefix: String,
    ledger: Mutex<Ledger>,
}

impl DryRunGateway {
    pub fn new(address_prefix: impl Into<String>) -> Self {
        Self {
            address_prefix: address_prefix.into(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Pretend the given code ids were uploaded earlier.
    pub fn with_codes(self, code_ids: impl IntoIterator<Item = CodeId>) -> Self {
        if let Ok(mut ledger) = self.ledger.lock() {
            for code_id in code_ids {
                ledger.codes.insert(code_id, "pre-existing".to_string());
            }
        }
        self
    }

    /// Pretend a contract already lives at `address`.
    pub fn with_contract(
        self,
        address: ContractAddress,
        code_id: CodeId,
        admin: Option<String>,
    ) -> Self {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.codes.entry(code_id).or_insert_with(|| "pre-existing".to_string());
            ledger
                .contracts
                .insert(address, ContractRecord { code_id, admin });
        }
        self
    }

    /// Code id currently stored for a contract, if any.
    pub fn code_of(&self, address: &ContractAddress) -> Option<CodeId> {
        self.ledger
            .lock()
            .ok()
            .and_then(|ledger| ledger.contracts.get(address).map(|c| c.code_id))
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, GatewayError> {
        self.ledger
            .lock()
            .map_err(|_| GatewayError::Transport("dry-run ledger is poisoned".to_string()))
    }
}

impl Gateway for DryRunGateway {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn upload(&self, _actor: &Actor, bytecode: &[u8]) -> Result<CodeId, GatewayError> {
        if bytecode.is_empty() {
            return Err(GatewayError::Rejected("empty wasm code".to_string()));
        }

        let mut ledger = self.ledger()?;
        let code_id = ledger.next_code_id();
        ledger
            .codes
            .insert(code_id, hex::encode(Sha256::digest(bytecode)));
        tracing::debug!(%code_id, size = bytecode.len(), "dry-run: stored code");
        Ok(code_id)
    }

    async fn instantiate(
        &self,
        _actor: &Actor,
        code_id: CodeId,
        label: &str,
        _msg: &Message,
        admin: Option<&str>,
    ) -> Result<ContractAddress, GatewayError> {
        let mut ledger = self.ledger()?;
        if !ledger.codes.contains_key(&code_id) {
            return Err(GatewayError::Rejected(format!("no such code id: {code_id}")));
        }

        ledger.instance_count += 1;
        let address = ContractAddress::new(format!(
            "{}1contract{:04}",
            self.address_prefix, ledger.instance_count
        ));
        ledger.contracts.insert(
            address.clone(),
            ContractRecord {
                code_id,
                admin: admin.map(str::to_string),
            },
        );
        tracing::debug!(%code_id, %address, label, "dry-run: instantiated contract");
        Ok(address)
    }

    async fn execute(
        &self,
        _actor: &Actor,
        contract: &ContractAddress,
        _msg: &Message,
    ) -> Result<Receipt, GatewayError> {
        let mut ledger = self.ledger()?;
        if !ledger.contracts.contains_key(contract) {
            return Err(GatewayError::Rejected(format!("no contract at {contract}")));
        }
        Ok(ledger.receipt("execute"))
    }

    async fn migrate(
        &self,
        actor: &Actor,
        contract: &ContractAddress,
        new_code_id: CodeId,
        _msg: &Message,
    ) -> Result<Receipt, GatewayError> {
        let mut ledger = self.ledger()?;
        if !ledger.codes.contains_key(&new_code_id) {
            return Err(GatewayError::Rejected(format!(
                "no such code id: {new_code_id}"
            )));
        }

        let record = ledger
            .contracts
            .get_mut(contract)
            .ok_or_else(|| GatewayError::Rejected(format!("no contract at {contract}")))?;

        if record.admin.as_deref() != Some(actor.as_str()) {
            return Err(GatewayError::Rejected(
                "unauthorized: caller is not the contract admin".to_string(),
            ));
        }

        record.code_id = new_code_id;
        Ok(ledger.receipt("migrate"))
    }
}
