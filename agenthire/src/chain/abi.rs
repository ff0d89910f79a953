//! Calldata encoding and typed decoding for the token, registry and escrow
//! contracts.
//!
//! Decoded tuples are validated here and turned into typed records, so
//! nothing above the chain boundary handles raw `Token`s.

use crate::error::{AppError, Result};
use crate::models::{AgentType, OnChainAgent, MAX_REPUTATION};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};
use ethers::utils::id;

// Token contract
pub const BALANCE_OF: &str = "balanceOf(address)";
pub const ALLOWANCE: &str = "allowance(address,address)";
pub const DECIMALS: &str = "decimals()";
pub const SYMBOL: &str = "symbol()";
pub const APPROVE: &str = "approve(address,uint256)";
pub const TRANSFER: &str = "transfer(address,uint256)";
pub const HAS_USER_CLAIMED_FREE: &str = "hasUserClaimedFree(address)";
pub const CLAIM_FREE_CREDITS: &str = "claimFreeCredits()";
pub const CLAIM_AGENT_TOKENS: &str = "claimAgentTokens(uint256)";

// Registry contract
pub const GET_ALL_ACTIVE_AGENTS: &str = "getAllActiveAgents()";
pub const GET_AGENT: &str = "getAgent(uint256)";

// Escrow contract
pub const GET_USER_DEPOSIT: &str = "getUserDeposit(address)";
pub const DEPOSIT: &str = "deposit(uint256)";

/// Selector followed by ABI-encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data
}

fn decode(signature: &str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    abi::decode(types, data)
        .map_err(|e| AppError::Chain(format!("Failed to decode {} return value: {}", signature, e)))
}

fn single(signature: &str, types: &[ParamType], data: &[u8]) -> Result<Token> {
    decode(signature, types, data)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Chain(format!("{} returned no value", signature)))
}

pub fn decode_uint(signature: &str, data: &[u8]) -> Result<U256> {
    match single(signature, &[ParamType::Uint(256)], data)? {
        Token::Uint(v) => Ok(v),
        other => Err(unexpected(signature, &other)),
    }
}

pub fn decode_u8(signature: &str, data: &[u8]) -> Result<u8> {
    let value = match single(signature, &[ParamType::Uint(8)], data)? {
        Token::Uint(v) => v,
        other => return Err(unexpected(signature, &other)),
    };
    if value > U256::from(u8::MAX) {
        return Err(AppError::Chain(format!("{} returned out-of-range value {}", signature, value)));
    }
    Ok(value.as_u32() as u8)
}

pub fn decode_bool(signature: &str, data: &[u8]) -> Result<bool> {
    match single(signature, &[ParamType::Bool], data)? {
        Token::Bool(b) => Ok(b),
        other => Err(unexpected(signature, &other)),
    }
}

pub fn decode_string(signature: &str, data: &[u8]) -> Result<String> {
    match single(signature, &[ParamType::String], data)? {
        Token::String(s) => Ok(s),
        other => Err(unexpected(signature, &other)),
    }
}

/// Decode `getAllActiveAgents()` into agent ids
pub fn decode_agent_ids(data: &[u8]) -> Result<Vec<u64>> {
    let token = single(
        GET_ALL_ACTIVE_AGENTS,
        &[ParamType::Array(Box::new(ParamType::Uint(256)))],
        data,
    )?;
    let items = match token {
        Token::Array(items) => items,
        other => return Err(unexpected(GET_ALL_ACTIVE_AGENTS, &other)),
    };

    items
        .into_iter()
        .map(|t| match t {
            Token::Uint(v) => u256_to_u64(GET_ALL_ACTIVE_AGENTS, v),
            other => Err(unexpected(GET_ALL_ACTIVE_AGENTS, &other)),
        })
        .collect()
}

fn agent_tuple_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Uint(8),
        ParamType::Uint(256),
        ParamType::Uint(16),
        ParamType::Bool,
    ])
}

/// Decode `getAgent(id)` into a validated record
pub fn decode_agent(agent_id: u64, data: &[u8]) -> Result<OnChainAgent> {
    let fields = match single(GET_AGENT, &[agent_tuple_type()], data)? {
        Token::Tuple(fields) => fields,
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    let [wallet, agent_type, price, reputation, active]: [Token; 5] = fields
        .try_into()
        .map_err(|f: Vec<Token>| AppError::Chain(format!("getAgent returned {} fields, expected 5", f.len())))?;

    let wallet_address = match wallet {
        Token::Address(a) => a,
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    let agent_type = match agent_type {
        Token::Uint(v) if v <= U256::from(u8::MAX) => AgentType::from_index(v.as_u32() as u8)
            .ok_or_else(|| AppError::Chain(format!("Agent {} has unknown agentType {}", agent_id, v)))?,
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    let price_per_task = match price {
        Token::Uint(v) => v,
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    let reputation = match reputation {
        Token::Uint(v) if v <= U256::from(u16::MAX) => {
            let rep = v.as_u32() as u16;
            if rep > MAX_REPUTATION {
                log::warn!("[chain] Agent {} reputation {} above {}, clamping", agent_id, rep, MAX_REPUTATION);
            }
            rep.min(MAX_REPUTATION)
        }
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    let active = match active {
        Token::Bool(b) => b,
        other => return Err(unexpected(GET_AGENT, &other)),
    };

    Ok(OnChainAgent {
        id: agent_id,
        wallet_address,
        agent_type,
        price_per_task,
        reputation,
        active,
    })
}

fn u256_to_u64(signature: &str, v: U256) -> Result<u64> {
    if v.bits() > 64 {
        return Err(AppError::Chain(format!("{} returned id {} that does not fit u64", signature, v)));
    }
    Ok(v.as_u64())
}

fn unexpected(signature: &str, token: &Token) -> AppError {
    AppError::Chain(format!("{} returned unexpected value {:?}", signature, token))
}

pub fn address_arg(address: Address) -> Token {
    Token::Address(address)
}

pub fn uint_arg(value: U256) -> Token {
    Token::Uint(value)
}
