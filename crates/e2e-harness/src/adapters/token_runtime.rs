//! # Native Token Runtime
//!
//! A [`ContractRuntime`] exposing the ERC-20 surface used by the scenarios
//! (`transfer`, `balanceOf`, `totalSupply`). Token balances live in the
//! host ledger under the denom `erc20/0x<contract>`, so every transfer goes
//! through the Balance Capability and its conservation rules.
//!
//! ## Bytecode
//!
//! | Part | Content |
//! |------|---------|
//! | Creation code | [`TOKEN_CODE`] ++ initial supply (32-byte word) |
//! | Runtime code | [`TOKEN_CODE`] |
//!
//! The initial supply is minted to the deployer.

use crate::domain::abi;
use crate::domain::types::{CallEnv, ContractArtifact, Execution};
use crate::ports::ContractRuntime;
use host_ledger::domain::context::Context;
use host_ledger::domain::errors::LedgerError;
use host_ledger::domain::value_objects::{Coin, Denom};
use host_ledger::ports::outbound::BalanceCapability;
use shared_types::{Address, Bytes, U256};
use std::sync::Arc;
use tracing::debug;

/// Runtime code tag identifying a native token contract.
pub const TOKEN_CODE: &[u8] = b"\xfe\x20native-erc20";

/// Module account minting initial token supply.
pub const TOKEN_MODULE: &str = "erc20";

/// Gas charged for deployment beyond the intrinsic cost.
const CREATE_GAS: u64 = 45_000;
/// Gas charged for a transfer.
const TRANSFER_GAS: u64 = 29_000;
/// Gas charged for a read.
const READ_GAS: u64 = 2_600;

/// Denom holding the balances of the token at `contract`.
pub fn token_denom(contract: Address) -> Result<Denom, LedgerError> {
    Denom::new(format!("erc20/{contract}"))
}

/// ERC-20 runtime over a balance capability.
#[derive(Debug)]
pub struct NativeTokenRuntime<B> {
    bank: Arc<B>,
    module: String,
}

impl<B: BalanceCapability> NativeTokenRuntime<B> {
    /// Creates a runtime minting through [`TOKEN_MODULE`].
    pub fn new(bank: Arc<B>) -> Self {
        Self {
            bank,
            module: TOKEN_MODULE.to_string(),
        }
    }

    /// Creation code; append the initial supply word as constructor argument.
    #[must_use]
    pub fn artifact() -> ContractArtifact {
        ContractArtifact {
            name: "NativeToken".to_string(),
            bytecode: Bytes::from_slice(TOKEN_CODE),
        }
    }

    /// Constructor argument for an initial supply.
    #[must_use]
    pub fn constructor_args(initial_supply: U256) -> Vec<u8> {
        abi::encode_uint(initial_supply).to_vec()
    }

    fn transfer(
        &self,
        ctx: &mut Context,
        env: &CallEnv,
        denom: Denom,
        args: &[u8],
    ) -> Result<Execution, LedgerError> {
        let (Ok(to), Ok(amount)) = (abi::decode_address(args, 0), abi::decode_uint(args, 1)) else {
            return Ok(revert("malformed transfer arguments", TRANSFER_GAS));
        };

        match self
            .bank
            .send(ctx, env.caller, to, &Coin::new(denom, amount))
        {
            Ok(()) => Ok(Execution::Success {
                output: abi::encode_bool(true).to_vec(),
                gas_used: TRANSFER_GAS,
            }),
            Err(LedgerError::InsufficientFunds { .. }) => Ok(revert(
                "ERC20: transfer amount exceeds balance",
                TRANSFER_GAS,
            )),
            Err(err) => Err(err),
        }
    }
}

fn revert(reason: &str, gas_used: u64) -> Execution {
    Execution::Revert {
        reason: reason.to_string(),
        gas_used,
    }
}

fn word_output(value: U256) -> Execution {
    Execution::Success {
        output: abi::encode_uint(value).to_vec(),
        gas_used: READ_GAS,
    }
}

impl<B: BalanceCapability> ContractRuntime for NativeTokenRuntime<B> {
    fn create(
        &self,
        ctx: &mut Context,
        env: &CallEnv,
        init_code: &[u8],
    ) -> Result<Execution, LedgerError> {
        let Some(args) = init_code.strip_prefix(TOKEN_CODE) else {
            return Ok(revert("unsupported creation code", 0));
        };
        let Ok(supply) = abi::decode_uint(args, 0) else {
            return Ok(revert("missing initial supply", 0));
        };

        let coin = Coin::new(token_denom(env.contract)?, supply);
        self.bank.mint(ctx, &self.module, &coin)?;
        self.bank
            .send_from_module_to_account(ctx, &self.module, env.caller, &coin)?;

        debug!(contract = %env.contract, owner = %env.caller, %coin, "token created");
        Ok(Execution::Success {
            output: TOKEN_CODE.to_vec(),
            gas_used: CREATE_GAS,
        })
    }

    fn call(
        &self,
        ctx: &mut Context,
        env: &CallEnv,
        code: &[u8],
        input: &[u8],
    ) -> Result<Execution, LedgerError> {
        if code != TOKEN_CODE {
            return Ok(revert("unsupported runtime code", 0));
        }
        let Ok((selector, args)) = abi::split_call(input) else {
            return Ok(revert("missing selector", 0));
        };
        let denom = token_denom(env.contract)?;

        match selector {
            abi::TRANSFER => self.transfer(ctx, env, denom, args),
            abi::BALANCE_OF => match abi::decode_address(args, 0) {
                Ok(holder) => Ok(word_output(self.bank.balance(ctx, holder, &denom)?.amount)),
                Err(_) => Ok(revert("malformed balanceOf argument", READ_GAS)),
            },
            abi::TOTAL_SUPPLY => Ok(word_output(self.bank.total_supply(ctx, &denom)?.amount)),
            _ => Ok(revert("unknown selector", 0)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
