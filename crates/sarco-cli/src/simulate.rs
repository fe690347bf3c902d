//! # Simulate Subcommand
//!
//! Replays a YAML scenario against a fresh protocol instance backed by an
//! in-memory token ledger and a manual clock, then prints a JSON report:
//! per-step outcomes, the event log, every actor's balances, case
//! summaries and the solvency audit.
//!
//! Actors are named. Each name deterministically derives an Ed25519
//! identity (and so an address), and each (case, custodian) pair derives
//! its shard key, so a scenario replays identically every time. Actors
//! listed under `actors` are minted their `balance` and approve the vault
//! for unlimited pulls.
//!
//! ```yaml
//! start: "2026-01-01T00:00:00Z"
//! actors:
//!   - { name: embalmer, balance: 100000000 }
//!   - { name: alice, balance: 50000000 }
//! steps:
//!   - { action: register, custodian: alice, bond: 20000000 }
//!   - action: create
//!     case: will
//!     embalmer: embalmer
//!     recipient: heir
//!     custodians: [alice]
//!     threshold: 1
//!     resurrection_in: 604800
//!     fee_rate: 10
//!   - { action: advance, secs: 604800 }
//!   - { action: publish, case: will, custodian: alice }
//!   - { action: clean, case: will, caller: embalmer, expect_error: TooEarlyForClean }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use sarco_core::{sha256_digest, Address, Amount, CanonicalBytes, CaseId, Clock, ManualClock, Timestamp};
use sarco_crypto::{sign_consent, AccusationProof, ConsentPayload, Ed25519KeyPair, ShardKey};
use sarco_protocol::{
    CreateCaseRequest, CustodianConsent, CustodianStats, InMemoryToken, ParameterName, ParameterSettings,
    ProfileMetadata, Protocol, ProtocolConfig, ProtocolError, ProtocolEvent, TokenLedger,
};

const DEFAULT_START: &str = "2026-01-01T00:00:00Z";
const DEFAULT_MAX_REWRAP_INTERVAL: u64 = 30 * 86_400;
const MAX_RESURRECTION_HORIZON: u64 = 365 * 86_400;

/// Arguments for the `sarco simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario YAML file.
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,
    /// Print the report on one line.
    #[arg(long)]
    pub compact: bool,
}

// ── Scenario Format ────────────────────────────────────────────────────

/// A scripted sequence of protocol operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Initial clock reading (RFC 3339, UTC).
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub parameters: ParameterSettings,
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    pub steps: Vec<Step>,
}

/// A funded actor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorSpec {
    pub name: String,
    #[serde(default)]
    pub balance: u64,
}

/// One operation plus the outcome it is expected to have.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Error kind (`timing`, `authorization`, ...) or variant name
    /// (`TooEarlyForClean`) the step must fail with.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// A protocol operation performed by named actors.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Advance {
        secs: u64,
    },
    Register {
        custodian: String,
        #[serde(default)]
        bond: u64,
    },
    UpdateProfile {
        custodian: String,
        peer_id: String,
        #[serde(default)]
        bond: u64,
    },
    Deposit {
        custodian: String,
        amount: u64,
    },
    WithdrawBond {
        custodian: String,
        amount: u64,
    },
    Create {
        case: String,
        embalmer: String,
        recipient: String,
        custodians: Vec<String>,
        threshold: u8,
        resurrection_in: u64,
        fee_rate: u64,
        #[serde(default)]
        max_rewrap_interval: Option<u64>,
        /// How long before now the custodians signed.
        #[serde(default)]
        signed_ago: u64,
    },
    Rewrap {
        case: String,
        caller: String,
        resurrection_in: u64,
    },
    Publish {
        case: String,
        custodian: String,
    },
    Accuse {
        case: String,
        custodians: Vec<String>,
        payee: String,
    },
    Clean {
        case: String,
        caller: String,
    },
    Bury {
        case: String,
        caller: String,
    },
    WithdrawReward {
        account: String,
    },
    WithdrawProtocolFees {
        caller: String,
    },
    SetParameter {
        caller: String,
        name: ParameterName,
        value: u64,
    },
    Freeze {
        account: String,
    },
    Unfreeze {
        account: String,
    },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Register { .. } => "register",
            Self::UpdateProfile { .. } => "update_profile",
            Self::Deposit { .. } => "deposit",
            Self::WithdrawBond { .. } => "withdraw_bond",
            Self::Create { .. } => "create",
            Self::Rewrap { .. } => "rewrap",
            Self::Publish { .. } => "publish",
            Self::Accuse { .. } => "accuse",
            Self::Clean { .. } => "clean",
            Self::Bury { .. } => "bury",
            Self::WithdrawReward { .. } => "withdraw_reward",
            Self::WithdrawProtocolFees { .. } => "withdraw_protocol_fees",
            Self::SetParameter { .. } => "set_parameter",
            Self::Freeze { .. } => "freeze",
            Self::Unfreeze { .. } => "unfreeze",
        }
    }
}

// ── Report ─────────────────────────────────────────────────────────────

/// Result of replaying a scenario.
#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub events: Vec<ProtocolEvent>,
    pub accounts: BTreeMap<String, AccountReport>,
    pub cases: Vec<CaseReport>,
    pub protocol_fee_pool: String,
    pub vault_balance: String,
    /// `"ok"` or the audit failure.
    pub audit: String,
    pub state_digest: String,
}

impl Report {
    /// Every step behaved as expected and the ledger is solvent.
    pub fn passed(&self) -> bool {
        self.audit == "ok" && self.steps.iter().all(|s| s.matched)
    }
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountReport {
    pub address: Address,
    pub token_balance: String,
    pub free_bond: String,
    pub cursed_bond: String,
    pub reward: String,
    pub stats: CustodianStats,
}

#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub label: String,
    pub id: CaseId,
    pub status: String,
    pub resurrection_time: Option<String>,
    pub published_count: usize,
    pub cleaned: bool,
}

// ── Runner ─────────────────────────────────────────────────────────────

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let scenario = load_scenario(&args.scenario)?;
    let report = simulate(&scenario)?;
    let rendered = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");
    if report.passed() {
        Ok(0)
    } else {
        tracing::warn!(audit = %report.audit, "scenario did not pass");
        Ok(1)
    }
}

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario: {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse scenario: {}", path.display()))
}

/// Replay `scenario` and build the report.
pub fn simulate(scenario: &Scenario) -> Result<Report> {
    let start = Timestamp::parse(scenario.start.as_deref().unwrap_or(DEFAULT_START))
        .context("invalid scenario start time")?;
    let mut sim = Simulator::new(start, scenario.parameters)?;
    for actor in &scenario.actors {
        sim.fund(&actor.name, Amount::from(actor.balance))?;
    }

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let at = sim.clock.now();
        let outcome = sim.step(&step.action)?;
        let error = outcome.as_ref().err();
        let matched = match (&step.expect_error, error) {
            (None, None) => true,
            (Some(expected), Some(e)) => {
                expected == e.kind().as_str() || *expected == variant_name(e)
            }
            _ => false,
        };
        if !matched {
            tracing::warn!(index, action = step.action.name(), "unexpected step outcome");
        }
        steps.push(StepOutcome {
            index,
            action: step.action.name(),
            at: at.to_iso8601(),
            error: error.map(|e| format!("{}: {e}", variant_name(e))),
            expected_error: step.expect_error.clone(),
            matched,
        });
    }
    sim.report(steps)
}

/// Name of the error variant, from its `Debug` rendering.
fn variant_name(e: &ProtocolError) -> String {
    format!("{e:?}")
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// 32 bytes derived from a label.
fn seed(label: &str) -> Result<[u8; 32]> {
    Ok(sha256_digest(&CanonicalBytes::new(&label)?).0)
}

struct Simulator {
    protocol: Protocol<InMemoryToken>,
    clock: Arc<ManualClock>,
    names: BTreeMap<String, Address>,
    cases: BTreeMap<String, CaseId>,
}

impl Simulator {
    fn new(start: Timestamp, parameters: ParameterSettings) -> Result<Self> {
        let admin = identity("admin")?.address();
        let vault = identity("vault")?.address();
        let clock = Arc::new(ManualClock::new(start));
        let config = ProtocolConfig {
            admin,
            vault,
            parameters,
        };
        let protocol = Protocol::new(&config, InMemoryToken::new(), clock.clone());
        let mut names = BTreeMap::new();
        names.insert("admin".to_string(), admin);
        names.insert("vault".to_string(), vault);
        Ok(Self {
            protocol,
            clock,
            names,
            cases: BTreeMap::new(),
        })
    }

    fn address(&mut self, name: &str) -> Result<Address> {
        if let Some(address) = self.names.get(name) {
            return Ok(*address);
        }
        let address = identity(name)?.address();
        self.names.insert(name.to_string(), address);
        Ok(address)
    }

    fn fund(&mut self, name: &str, balance: Amount) -> Result<()> {
        let account = self.address(name)?;
        let vault = self.protocol.vault();
        let token = self.protocol.token_mut();
        token
            .mint(account, balance)
            .map_err(|e| anyhow!("failed to fund {name}: {e}"))?;
        token
            .approve(account, vault, Amount::MAX)
            .map_err(|e| anyhow!("failed to approve vault for {name}: {e}"))?;
        Ok(())
    }

    fn case(&self, label: &str) -> Result<CaseId> {
        self.cases
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("scenario refers to unknown case {label:?}"))
    }

    /// Run one action. The outer `Result` is a malformed scenario, the
    /// inner one the protocol's verdict.
    fn step(&mut self, action: &Action) -> Result<Result<(), ProtocolError>> {
        let outcome = match action {
            Action::Advance { secs } => {
                self.clock.advance(*secs);
                Ok(())
            }
            Action::Register { custodian, bond } => {
                let caller = self.address(custodian)?;
                let metadata = self.metadata(custodian)?;
                self.protocol
                    .register_custodian(caller, metadata, Amount::from(*bond))
            }
            Action::UpdateProfile {
                custodian,
                peer_id,
                bond,
            } => {
                let caller = self.address(custodian)?;
                let mut metadata = self.metadata(custodian)?;
                metadata.peer_id = peer_id.clone();
                self.protocol
                    .update_custodian(caller, metadata, Amount::from(*bond))
            }
            Action::Deposit { custodian, amount } => {
                let caller = self.address(custodian)?;
                self.protocol.deposit_bond(caller, Amount::from(*amount))
            }
            Action::WithdrawBond { custodian, amount } => {
                let caller = self.address(custodian)?;
                self.protocol.withdraw_bond(caller, Amount::from(*amount))
            }
            Action::Create {
                case,
                embalmer,
                recipient,
                custodians,
                threshold,
                resurrection_in,
                fee_rate,
                max_rewrap_interval,
                signed_ago,
            } => {
                let case_id = CaseId::from_uuid(
                    uuid::Builder::from_random_bytes(truncate(seed(&format!("case:{case}"))?))
                        .into_uuid(),
                );
                let now = self.clock.now();
                let creation_time = Timestamp::from_epoch_secs(now.epoch_secs().saturating_sub(*signed_ago));
                let mut request = CreateCaseRequest {
                    case_id,
                    name: case.clone(),
                    recipient: self.address(recipient)?,
                    resurrection_time: now.saturating_add_secs(*resurrection_in),
                    threshold: *threshold,
                    transferable: false,
                    creation_time,
                    maximum_rewrap_interval: max_rewrap_interval.unwrap_or(DEFAULT_MAX_REWRAP_INTERVAL),
                    maximum_resurrection_time: now.saturating_add_secs(MAX_RESURRECTION_HORIZON),
                    custodians: Vec::with_capacity(custodians.len()),
                };
                for name in custodians {
                    let consent = self.consent(&request, case, name, Amount::from(*fee_rate))?;
                    request.custodians.push(consent);
                }
                let caller = self.address(embalmer)?;
                let result = self.protocol.create_case(caller, request).map(drop);
                if result.is_ok() {
                    self.cases.insert(case.clone(), case_id);
                }
                result
            }
            Action::Rewrap {
                case,
                caller,
                resurrection_in,
            } => {
                let case_id = self.case(case)?;
                let caller = self.address(caller)?;
                let new_time = self.clock.now().saturating_add_secs(*resurrection_in);
                self.protocol.rewrap(caller, case_id, new_time)
            }
            Action::Publish { case, custodian } => {
                let case_id = self.case(case)?;
                let caller = self.address(custodian)?;
                let shard = shard_key(case, custodian)?;
                self.protocol.publish_shard(caller, case_id, shard)
            }
            Action::Accuse {
                case,
                custodians,
                payee,
            } => {
                let case_id = self.case(case)?;
                let payment_address = self.address(payee)?;
                let proofs = custodians
                    .iter()
                    .map(|name| {
                        let shard = shard_key(case, name)?;
                        AccusationProof::sign(&shard, case_id, payment_address)
                            .map_err(|e| anyhow!("failed to sign accusation: {e}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.protocol.accuse(case_id, &proofs, payment_address)
            }
            Action::Clean { case, caller } => {
                let case_id = self.case(case)?;
                let caller = self.address(caller)?;
                self.protocol.clean(caller, case_id)
            }
            Action::Bury { case, caller } => {
                let case_id = self.case(case)?;
                let caller = self.address(caller)?;
                self.protocol.bury(caller, case_id)
            }
            Action::WithdrawReward { account } => {
                let caller = self.address(account)?;
                self.protocol.withdraw_reward(caller).map(drop)
            }
            Action::WithdrawProtocolFees { caller } => {
                let caller = self.address(caller)?;
                self.protocol.withdraw_protocol_fees(caller).map(drop)
            }
            Action::SetParameter { caller, name, value } => {
                let caller = self.address(caller)?;
                self.protocol.set_parameter(caller, *name, *value)
            }
            Action::Freeze { account } => {
                let account = self.address(account)?;
                self.protocol.token_mut().freeze(account);
                Ok(())
            }
            Action::Unfreeze { account } => {
                let account = self.address(account)?;
                self.protocol.token_mut().unfreeze(account);
                Ok(())
            }
        };
        Ok(outcome)
    }

    fn metadata(&self, custodian: &str) -> Result<ProfileMetadata> {
        Ok(ProfileMetadata {
            peer_id: format!("peer:{custodian}"),
            minimum_digging_fee_rate: 1,
            maximum_rewrap_interval: DEFAULT_MAX_REWRAP_INTERVAL,
            maximum_resurrection_time: self.clock.now().saturating_add_secs(MAX_RESURRECTION_HORIZON),
        })
    }

    fn consent(
        &mut self,
        request: &CreateCaseRequest,
        case: &str,
        custodian: &str,
        digging_fee_rate: Amount,
    ) -> Result<CustodianConsent> {
        let id = identity(custodian)?;
        let public_key = shard_key(case, custodian)?.public_key();
        let payload = ConsentPayload {
            public_key,
            digging_fee_rate,
            maximum_rewrap_interval: request.maximum_rewrap_interval,
            maximum_resurrection_time: request.maximum_resurrection_time,
            creation_time: request.creation_time,
        };
        let signature = sign_consent(&id, &payload).map_err(|e| anyhow!("failed to sign consent: {e}"))?;
        Ok(CustodianConsent {
            address: self.address(custodian)?,
            public_key,
            digging_fee_rate,
            signature,
        })
    }

    fn report(&self, steps: Vec<StepOutcome>) -> Result<Report> {
        let p = &self.protocol;
        let token = p.token();
        let mut accounts = BTreeMap::new();
        for (name, address) in &self.names {
            let bond = p.bond_account(*address);
            accounts.insert(
                name.clone(),
                AccountReport {
                    address: *address,
                    token_balance: token.balance_of(*address)?.to_string(),
                    free_bond: bond.free_bond.to_string(),
                    cursed_bond: bond.cursed_bond.to_string(),
                    reward: p.reward_of(*address).to_string(),
                    stats: p.stats(*address),
                },
            );
        }

        let mut cases = Vec::with_capacity(self.cases.len());
        for (label, id) in &self.cases {
            let case = p.case(*id)?;
            cases.push(CaseReport {
                label: label.clone(),
                id: *id,
                status: case.status.to_string(),
                resurrection_time: case.effective_resurrection_time().map(|t| t.to_iso8601()),
                published_count: case.published_count,
                cleaned: case.cleaned,
            });
        }

        let audit = match p.audit_solvency() {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        };
        Ok(Report {
            steps,
            events: p.events().to_vec(),
            accounts,
            cases,
            protocol_fee_pool: p.protocol_fee_pool().to_string(),
            vault_balance: token.balance_of(p.vault())?.to_string(),
            audit,
            state_digest: p.ledger().state_digest()?.to_string(),
        })
    }
}

fn identity(name: &str) -> Result<Ed25519KeyPair> {
    Ok(Ed25519KeyPair::from_seed(&seed(&format!("identity:{name}"))?))
}

fn shard_key(case: &str, custodian: &str) -> Result<ShardKey> {
    Ok(ShardKey::from_bytes(seed(&format!("shard:{case}:{custodian}"))?))
}

fn truncate(bytes: [u8; 32]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes[..16]);
    out
}
