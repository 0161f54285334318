use ethers::abi::Token;
use ethers::types::U256;
use ethers::utils::parse_ether;

use crate::domain::errors::ContractError;
use crate::domain::models::{DeploymentPlan, StepArg, StepSpec};

pub const QC_TOKEN: &str = "QCToken";
pub const QUIZ_CHAIN_CHALLENGE: &str = "QuizChainChallenge";

/// Second constructor argument of `QuizChainChallenge`.
pub const CHALLENGE_INIT_VALUE: u64 = 100;

/// Tokens moved into the challenge contract by `addRewards`, in whole QC.
pub const INITIAL_REWARDS_QC: u64 = 10_000;

/// QCToken, then QuizChainChallenge wired to it, then the allowance and the
/// initial reward funding.
pub fn quiz_chain_plan() -> Result<DeploymentPlan, ContractError> {
    let rewards = parse_ether(INITIAL_REWARDS_QC)
        .map_err(|e| ContractError::ConfigError(format!("Invalid reward amount: {}", e)))?;

    let mut builder = DeploymentPlan::builder();

    let token = builder.push(StepSpec::deploy(QC_TOKEN, vec![]));
    let challenge = builder.push(StepSpec::deploy(
        QUIZ_CHAIN_CHALLENGE,
        vec![
            StepArg::ResourceOf(token),
            StepArg::Literal(Token::Uint(U256::from(CHALLENGE_INIT_VALUE))),
        ],
    ));
    builder.push(
        StepSpec::invoke(
            token,
            "approve",
            vec![StepArg::ResourceOf(challenge), StepArg::Literal(Token::Uint(U256::MAX))],
        )
        .with_label("approve QuizChainChallenge as QCToken spender"),
    );
    builder.push(
        StepSpec::invoke(challenge, "addRewards", vec![StepArg::Literal(Token::Uint(rewards))])
            .with_label("fund QuizChainChallenge rewards"),
    );

    Ok(builder.build())
}
