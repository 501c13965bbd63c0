//! Contract bindings used by the permission guard and balance listing.

use alloy_sol_types::{SolCall, sol};

use crate::error::{DeployError, OnChainAction, Result};
use crate::types::{Address, Bytes, U256};

sol! {
    #[derive(Debug)]
    function operators(address user, address operator) external view returns (uint256);

    #[derive(Debug)]
    function toggleOperator(address user, address operator) external;

    #[derive(Debug)]
    function balanceOf(address account) external view returns (uint256);

    #[derive(Debug)]
    function decimals() external view returns (uint8);

    #[derive(Debug)]
    function symbol() external view returns (string);

    #[derive(Debug)]
    function name() external view returns (string);
}

pub fn operators_calldata(owner: Address, operator: Address) -> Bytes {
    operatorsCall {
        user: owner,
        operator,
    }
    .abi_encode()
    .into()
}

pub fn decode_operators(data: &[u8]) -> Result<U256> {
    operatorsCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| DeployError::on_chain(OnChainAction::Read, format!("operators(): {e}")))
}

pub fn toggle_operator_calldata(owner: Address, operator: Address) -> Bytes {
    toggleOperatorCall {
        user: owner,
        operator,
    }
    .abi_encode()
    .into()
}

pub fn balance_of_calldata(holder: Address) -> Bytes {
    balanceOfCall { account: holder }.abi_encode().into()
}

pub fn decode_balance_of(data: &[u8]) -> Result<U256> {
    balanceOfCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| DeployError::on_chain(OnChainAction::Read, format!("balanceOf(): {e}")))
}

pub fn decimals_calldata() -> Bytes {
    decimalsCall {}.abi_encode().into()
}

pub fn decode_decimals(data: &[u8]) -> Result<u8> {
    decimalsCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| DeployError::on_chain(OnChainAction::Read, format!("decimals(): {e}")))
}

pub fn symbol_calldata() -> Bytes {
    symbolCall {}.abi_encode().into()
}

pub fn decode_symbol(data: &[u8]) -> Result<String> {
    symbolCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| DeployError::on_chain(OnChainAction::Read, format!("symbol(): {e}")))
}

pub fn name_calldata() -> Bytes {
    nameCall {}.abi_encode().into()
}

pub fn decode_name(data: &[u8]) -> Result<String> {
    nameCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| DeployError::on_chain(OnChainAction::Read, format!("name(): {e}")))
}
