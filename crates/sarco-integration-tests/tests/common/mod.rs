//! Shared fixture: a protocol instance over an in-memory token with a
//! manual clock, funded custodians and one funded embalmer.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sarco_core::{Address, Amount, CaseId, Clock, ManualClock, Timestamp};
use sarco_crypto::{sign_consent, AccusationProof, ConsentPayload, Ed25519KeyPair, ShardKey};
use sarco_protocol::{
    CreateCaseRequest, CustodianConsent, InMemoryToken, ParameterSettings, ProfileMetadata, Protocol,
    ProtocolConfig, ProtocolError, TokenLedger,
};

/// 2026-01-01T00:00:00Z
pub const T0: u64 = 1_767_225_600;
pub const HOUR: u64 = 3_600;
pub const DAY: u64 = 86_400;
pub const WEEK: u64 = 604_800;

pub const CUSTODIAN_FUNDS: Amount = 1_000_000_000_000;
pub const EMBALMER_FUNDS: Amount = 1_000_000_000_000_000;

pub fn admin() -> Address {
    Address::from_bytes([0xad; 20])
}

pub fn vault() -> Address {
    Address::from_bytes([0xee; 20])
}

pub fn embalmer() -> Address {
    Address::from_bytes([0xe0; 20])
}

pub fn recipient() -> Address {
    Address::from_bytes([0xf0; 20])
}

pub fn ts(secs: u64) -> Timestamp {
    Timestamp::from_epoch_secs(secs)
}

pub fn metadata() -> ProfileMetadata {
    ProfileMetadata {
        peer_id: "12D3KooWcustodian".to_string(),
        minimum_digging_fee_rate: 1,
        maximum_rewrap_interval: 4 * WEEK,
        maximum_resurrection_time: ts(T0 + 365 * DAY),
    }
}

pub struct Harness {
    pub protocol: Protocol<InMemoryToken>,
    pub clock: Arc<ManualClock>,
    pub custodians: Vec<Ed25519KeyPair>,
    pub cases: Vec<CaseId>,
    shards: BTreeMap<(CaseId, Address), ShardKey>,
}

impl Harness {
    /// `count` custodians, each registered with `bond` free bond.
    pub fn new(count: usize, bond: Amount) -> Self {
        Self::with_settings(count, bond, ParameterSettings::default())
    }

    pub fn with_settings(count: usize, bond: Amount, settings: ParameterSettings) -> Self {
        let mut h = Self::unregistered(count, settings);
        for i in 0..count {
            let c = h.custodian(i);
            h.protocol.register_custodian(c, metadata(), bond).unwrap();
        }
        h
    }

    /// `count` funded custodians with no profile yet.
    pub fn unregistered(count: usize, settings: ParameterSettings) -> Self {
        let clock = Arc::new(ManualClock::new(ts(T0)));
        let config = ProtocolConfig {
            admin: admin(),
            vault: vault(),
            parameters: settings,
        };
        let mut protocol = Protocol::new(&config, InMemoryToken::new(), clock.clone());
        let custodians: Vec<Ed25519KeyPair> = (0..count)
            .map(|i| Ed25519KeyPair::from_seed(&[u8::try_from(i + 1).unwrap(); 32]))
            .collect();

        let token = protocol.token_mut();
        token.mint(embalmer(), EMBALMER_FUNDS).unwrap();
        token.approve(embalmer(), vault(), Amount::MAX).unwrap();
        for c in &custodians {
            token.mint(c.address(), CUSTODIAN_FUNDS).unwrap();
            token.approve(c.address(), vault(), Amount::MAX).unwrap();
        }
        Self {
            protocol,
            clock,
            custodians,
            cases: Vec::new(),
            shards: BTreeMap::new(),
        }
    }

    pub fn custodian(&self, i: usize) -> Address {
        self.custodians[i].address()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn set_time(&self, secs: u64) {
        self.clock.set(ts(secs)).unwrap();
    }

    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs);
    }

    pub fn balance(&self, account: Address) -> Amount {
        self.protocol.token().balance_of(account).unwrap()
    }

    /// A request assigning `members` (custodian indices), every consent
    /// freshly signed at the current time.
    pub fn request(
        &mut self,
        members: &[usize],
        threshold: u8,
        fee_rate: Amount,
        interval: u64,
    ) -> CreateCaseRequest {
        let now = self.now();
        let mut request = CreateCaseRequest {
            case_id: CaseId::new(),
            name: "final letters".to_string(),
            recipient: recipient(),
            resurrection_time: now.saturating_add_secs(interval),
            threshold,
            transferable: false,
            creation_time: now,
            maximum_rewrap_interval: 4 * WEEK,
            maximum_resurrection_time: ts(T0 + 365 * DAY),
            custodians: Vec::new(),
        };
        for &i in members {
            let address = self.custodian(i);
            let shard = ShardKey::from(&Ed25519KeyPair::generate());
            let payload = ConsentPayload {
                public_key: shard.public_key(),
                digging_fee_rate: fee_rate,
                maximum_rewrap_interval: request.maximum_rewrap_interval,
                maximum_resurrection_time: request.maximum_resurrection_time,
                creation_time: request.creation_time,
            };
            let signature = sign_consent(&self.custodians[i], &payload).unwrap();
            request.custodians.push(CustodianConsent {
                address,
                public_key: shard.public_key(),
                digging_fee_rate: fee_rate,
                signature,
            });
            self.shards.insert((request.case_id, address), shard);
        }
        request
    }

    pub fn try_create(
        &mut self,
        members: &[usize],
        threshold: u8,
        fee_rate: Amount,
        interval: u64,
    ) -> Result<CaseId, ProtocolError> {
        let request = self.request(members, threshold, fee_rate, interval);
        let id = self.protocol.create_case(embalmer(), request)?;
        self.cases.push(id);
        Ok(id)
    }

    pub fn create(&mut self, members: &[usize], threshold: u8, fee_rate: Amount, interval: u64) -> CaseId {
        self.try_create(members, threshold, fee_rate, interval).unwrap()
    }

    pub fn shard(&self, case_id: CaseId, i: usize) -> ShardKey {
        self.shards[&(case_id, self.custodian(i))].clone()
    }

    /// The shard of custodian `i` on `case_id`, if they were assigned.
    pub fn find_shard(&self, case_id: CaseId, i: usize) -> Option<ShardKey> {
        self.shards.get(&(case_id, self.custodian(i))).cloned()
    }

    pub fn publish(&mut self, case_id: CaseId, i: usize) -> Result<(), ProtocolError> {
        let shard = self.shard(case_id, i);
        let custodian = self.custodian(i);
        self.protocol.publish_shard(custodian, case_id, shard)
    }

    pub fn accuse(&mut self, case_id: CaseId, members: &[usize], payee: Address) -> Result<(), ProtocolError> {
        let proofs: Vec<AccusationProof> = members
            .iter()
            .map(|&i| AccusationProof::sign(&self.shard(case_id, i), case_id, payee).unwrap())
            .collect();
        self.protocol.accuse(case_id, &proofs, payee)
    }

    pub fn resurrection_time(&self, case_id: CaseId) -> u64 {
        self.protocol.case(case_id).unwrap().resurrection_time.epoch_secs()
    }

    pub fn digest(&self) -> String {
        self.protocol.ledger().state_digest().unwrap().to_hex()
    }
}
