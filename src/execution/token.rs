// NEP-141 fungible token actions used by the settlement legs

use near_primitives::{
    transaction::{Action, FunctionCallAction, TransferAction},
    types::{AccountId, Gas},
};
use near_token::NearToken;
use num_bigint::BigUint;

pub const FT_TRANSFER: &str = "ft_transfer";
pub const STORAGE_DEPOSIT: &str = "storage_deposit";
pub const STORAGE_BALANCE_OF: &str = "storage_balance_of";

/// 30 TGas covers ft_transfer and storage_deposit on standard token contracts
pub const FT_CALL_GAS: u64 = 30_000_000_000_000;

/// 0.00125 NEAR, the NEP-145 registration deposit of standard token contracts
pub const STORAGE_DEPOSIT_YOCTO: u128 = 1_250_000_000_000_000_000_000;

/// ft_transfer requires exactly one attached yoctoNEAR
const ONE_YOCTO: u128 = 1;

pub fn ft_transfer_action(receiver_id: &AccountId, amount_raw: &BigUint, memo: Option<&str>) -> Action {
    let args = serde_json::json!({
        "receiver_id": receiver_id.to_string(),
        "amount": amount_raw.to_string(),
        "memo": memo,
    });

    function_call(FT_TRANSFER, args, ONE_YOCTO)
}

pub fn storage_deposit_action(account_id: &AccountId) -> Action {
    let args = serde_json::json!({
        "account_id": account_id.to_string(),
        "registration_only": true,
    });

    function_call(STORAGE_DEPOSIT, args, STORAGE_DEPOSIT_YOCTO)
}

/// Native NEAR transfer, used to fund implicit accounts
pub fn native_transfer_action(amount_yocto: u128) -> Action {
    Action::Transfer(TransferAction {
        deposit: NearToken::from_yoctonear(amount_yocto),
    })
}

fn function_call(method_name: &str, args: serde_json::Value, deposit_yocto: u128) -> Action {
    Action::FunctionCall(Box::new(FunctionCallAction {
        method_name: method_name.to_string(),
        args: args.to_string().into_bytes(),
        gas: Gas::from_gas(FT_CALL_GAS),
        deposit: NearToken::from_yoctonear(deposit_yocto),
    }))
}
