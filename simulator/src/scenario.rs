//! Simulation scenarios.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bundleswap_common::{AssetUnit, ContractId, Flow, SettlementState, TokenId};

/// Fungible contract used by all scenarios.
pub const GOLD: &str = "GOLD";
/// Non-fungible contract used by all scenarios.
pub const DEEDS: &str = "DEEDS";

/// A simulation scenario: a seeded world plus scripted steps against one
/// settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Initial contract state.
    pub world: WorldSpec,
    /// Steps to run in order.
    pub steps: Vec<ScenarioStep>,
}

/// Initial asset-contract state for a scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSpec {
    /// GOLD minted per party.
    pub gold_holdings: Vec<(String, Decimal)>,
    /// GOLD allowances granted to the engine's custody account.
    pub gold_allowances: Vec<(String, Decimal)>,
    /// Deeds minted per party.
    pub deed_owners: Vec<(String, u64)>,
    /// Parties granting the engine's custody account a standing deed
    /// operator authorization.
    pub deed_operators: Vec<String>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Propose a settlement; later steps refer to it implicitly.
    Create {
        creator: String,
        flows: Vec<Flow>,
        auto_settle: bool,
    },
    /// One sender approves, attaching native currency.
    Approve {
        sender: String,
        attach: Decimal,
        expect: Expectation,
    },
    /// Any party requests execution.
    Execute { caller: String, expect: Expectation },
    /// A participant cancels.
    Cancel { caller: String },
    /// Overwrite a party's GOLD allowance to the custody account.
    SetGoldAllowance { owner: String, amount: Decimal },
    /// Assert a condition on the world.
    Assert(AssertCondition),
}

/// Whether a step is expected to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expectation {
    Success,
    Failure,
}

/// Conditions that can be asserted mid-scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// Settlement is in the given state.
    State(SettlementState),
    /// A deed has the given owner.
    DeedOwner { token: u64, owner: String },
    /// A party holds the given GOLD balance.
    GoldBalance { party: String, amount: Decimal },
    /// A party holds the given settled native balance.
    NativeBalance { party: String, amount: Decimal },
    /// The settlement's escrow total equals the given amount.
    EscrowTotal(Decimal),
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str, parties: usize, seed: u64) -> anyhow::Result<Self> {
        match name {
            "three-party-barter" => Ok(Self::three_party_barter(true)),
            "manual-execute" => Ok(Self::three_party_barter(false)),
            "failure-retry" => Ok(Self::failure_retry()),
            "cancel-refund" => Ok(Self::cancel_refund()),
            "random-ring" => Ok(Self::random_ring(parties, seed)),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Names of all built-in scenarios.
    pub fn all_names() -> &'static [&'static str] {
        &[
            "three-party-barter",
            "manual-execute",
            "failure-retry",
            "cancel-refund",
            "random-ring",
        ]
    }

    fn barter_world() -> WorldSpec {
        WorldSpec {
            gold_holdings: vec![("CAROL".into(), Decimal::from(1000))],
            gold_allowances: vec![("CAROL".into(), Decimal::from(500))],
            deed_owners: vec![("ALICE".into(), 1)],
            deed_operators: vec!["ALICE".into()],
        }
    }

    fn barter_flows() -> Vec<Flow> {
        vec![
            Flow::new(
                "ALICE",
                "BOB",
                AssetUnit::NonFungible {
                    contract: ContractId::new(DEEDS),
                    token: TokenId::new(1),
                },
            ),
            Flow::new(
                "BOB",
                "CAROL",
                AssetUnit::Native {
                    amount: Decimal::new(5, 1),
                },
            ),
            Flow::new(
                "CAROL",
                "ALICE",
                AssetUnit::Fungible {
                    contract: ContractId::new(GOLD),
                    amount: Decimal::from(500),
                },
            ),
        ]
    }

    fn barter_outcome_asserts() -> Vec<ScenarioStep> {
        let half = Decimal::new(5, 1);
        vec![
            ScenarioStep::Assert(AssertCondition::State(SettlementState::Executed)),
            ScenarioStep::Assert(AssertCondition::DeedOwner {
                token: 1,
                owner: "BOB".into(),
            }),
            ScenarioStep::Assert(AssertCondition::GoldBalance {
                party: "ALICE".into(),
                amount: Decimal::from(500),
            }),
            ScenarioStep::Assert(AssertCondition::NativeBalance {
                party: "CAROL".into(),
                amount: half,
            }),
        ]
    }

    /// Deed, native, and token moving in a triangle; executes on the
    /// last approval (or by an explicit call when auto-settle is off).
    fn three_party_barter(auto_settle: bool) -> Self {
        let half = Decimal::new(5, 1);

        let mut steps = vec![
            ScenarioStep::Create {
                creator: "ALICE".into(),
                flows: Self::barter_flows(),
                auto_settle,
            },
            ScenarioStep::Approve {
                sender: "ALICE".into(),
                attach: Decimal::ZERO,
                expect: Expectation::Success,
            },
            ScenarioStep::Approve {
                sender: "BOB".into(),
                attach: half,
                expect: Expectation::Success,
            },
            ScenarioStep::Assert(AssertCondition::EscrowTotal(half)),
            ScenarioStep::Approve {
                sender: "CAROL".into(),
                attach: Decimal::ZERO,
                expect: Expectation::Success,
            },
        ];
        if !auto_settle {
            steps.push(ScenarioStep::Assert(AssertCondition::State(
                SettlementState::Created,
            )));
            steps.push(ScenarioStep::Execute {
                caller: "DAVE".into(),
                expect: Expectation::Success,
            });
        }
        steps.extend(Self::barter_outcome_asserts());

        Self {
            name: if auto_settle {
                "three-party-barter".into()
            } else {
                "manual-execute".into()
            },
            description: "NFT, native, and fungible units settling in one atomic triangle"
                .into(),
            world: Self::barter_world(),
            steps,
        }
    }

    /// The last approval trips auto-execution into a revoked allowance;
    /// the settlement stays pending and a later retry lands everything.
    fn failure_retry() -> Self {
        let half = Decimal::new(5, 1);

        let mut steps = vec![
            ScenarioStep::SetGoldAllowance {
                owner: "CAROL".into(),
                amount: Decimal::ZERO,
            },
            ScenarioStep::Create {
                creator: "ALICE".into(),
                flows: Self::barter_flows(),
                auto_settle: true,
            },
            ScenarioStep::Approve {
                sender: "ALICE".into(),
                attach: Decimal::ZERO,
                expect: Expectation::Success,
            },
            ScenarioStep::Approve {
                sender: "BOB".into(),
                attach: half,
                expect: Expectation::Success,
            },
            ScenarioStep::Approve {
                sender: "CAROL".into(),
                attach: Decimal::ZERO,
                expect: Expectation::Failure,
            },
            ScenarioStep::Assert(AssertCondition::State(SettlementState::Created)),
            ScenarioStep::Assert(AssertCondition::EscrowTotal(half)),
            ScenarioStep::Assert(AssertCondition::DeedOwner {
                token: 1,
                owner: "ALICE".into(),
            }),
            ScenarioStep::SetGoldAllowance {
                owner: "CAROL".into(),
                amount: Decimal::from(500),
            },
            ScenarioStep::Execute {
                caller: "CAROL".into(),
                expect: Expectation::Success,
            },
        ];
        steps.extend(Self::barter_outcome_asserts());

        Self {
            name: "failure-retry".into(),
            description: "Auto-execution fails on a revoked authorization, then retries clean"
                .into(),
            world: Self::barter_world(),
            steps,
        }
    }

    /// Escrow goes in, the settlement is cancelled, and the exact
    /// deposits come back.
    fn cancel_refund() -> Self {
        let half = Decimal::new(5, 1);

        Self {
            name: "cancel-refund".into(),
            description: "Cancellation refunds escrowed native to the senders who supplied it"
                .into(),
            world: Self::barter_world(),
            steps: vec![
                ScenarioStep::Create {
                    creator: "ALICE".into(),
                    flows: Self::barter_flows(),
                    auto_settle: false,
                },
                ScenarioStep::Approve {
                    sender: "BOB".into(),
                    attach: half,
                    expect: Expectation::Success,
                },
                ScenarioStep::Assert(AssertCondition::EscrowTotal(half)),
                ScenarioStep::Cancel {
                    caller: "BOB".into(),
                },
                ScenarioStep::Assert(AssertCondition::State(SettlementState::Cancelled)),
                ScenarioStep::Assert(AssertCondition::NativeBalance {
                    party: "BOB".into(),
                    amount: half,
                }),
                ScenarioStep::Approve {
                    sender: "ALICE".into(),
                    attach: Decimal::ZERO,
                    expect: Expectation::Failure,
                },
            ],
        }
    }

    /// A ring of parties passing random GOLD amounts, approved in a
    /// shuffled order; the last approval settles the whole ring.
    fn random_ring(parties: usize, seed: u64) -> Self {
        let parties = parties.max(3);
        let mut rng = StdRng::seed_from_u64(seed);

        let names: Vec<String> = (0..parties).map(|i| format!("PARTY_{i}")).collect();
        let grant = Decimal::from(1000);

        let flows: Vec<Flow> = (0..parties)
            .map(|i| {
                let amount = Decimal::from(rng.gen_range(1..=500));
                Flow::new(
                    names[i].as_str(),
                    names[(i + 1) % parties].as_str(),
                    AssetUnit::Fungible {
                        contract: ContractId::new(GOLD),
                        amount,
                    },
                )
            })
            .collect();

        let mut order: Vec<usize> = (0..parties).collect();
        order.shuffle(&mut rng);

        let mut steps = vec![ScenarioStep::Create {
            creator: names[0].clone(),
            flows,
            auto_settle: true,
        }];
        steps.extend(order.into_iter().map(|i| ScenarioStep::Approve {
            sender: names[i].clone(),
            attach: Decimal::ZERO,
            expect: Expectation::Success,
        }));
        steps.push(ScenarioStep::Assert(AssertCondition::State(
            SettlementState::Executed,
        )));

        Self {
            name: "random-ring".into(),
            description: format!("{parties} parties settling a random fungible ring atomically"),
            world: WorldSpec {
                gold_holdings: names.iter().map(|n| (n.clone(), grant)).collect(),
                gold_allowances: names.iter().map(|n| (n.clone(), grant)).collect(),
                deed_owners: vec![],
                deed_operators: vec![],
            },
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_named_scenarios_load() {
        for name in Scenario::all_names() {
            let scenario = Scenario::load(name, 5, 7).unwrap();
            assert!(!scenario.steps.is_empty(), "{name} has no steps");
        }
    }

    #[test]
    fn test_unknown_scenario_is_an_error() {
        assert!(Scenario::load("nope", 3, 0).is_err());
    }

    #[test]
    fn test_random_ring_is_reproducible() {
        let a = Scenario::random_ring(6, 42);
        let b = Scenario::random_ring(6, 42);
        assert_eq!(
            serde_json::to_string(&a.steps).unwrap(),
            serde_json::to_string(&b.steps).unwrap()
        );
    }
}
