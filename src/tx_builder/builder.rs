//! Operation request to unsigned transaction
//!
//! [`TransactionBuilder`] ties the pieces together: resolve the token and
//! amount, plan the operation's instructions against the prepared context,
//! prepend compute budget instructions, then assemble and validate.
//!
//! ## Key Features
//! - One entry point per build, no state kept between calls
//! - Typed and plain-data (DTO) context inputs
//! - Every failure is a [`TransactionBuilderError`], logged with its category

use serde::Deserialize;
use solana_sdk::{address_lookup_table::AddressLookupTableAccount, pubkey::Pubkey};

use crate::address::parse_address;
use crate::amount::{to_raw_units, to_raw_units_f64, TokenAmount};
use crate::config::BuilderConfig;
use crate::registry::Token;
use crate::structured_logging::BuildLogger;
use crate::tx_builder::assembler::assemble;
use crate::tx_builder::context::{PreparedContext, PreparedContextDto};
use crate::tx_builder::errors::TransactionBuilderError;
use crate::tx_builder::instructions::{
    lending, plan_compute_budget, swap, transfer, InstructionPlan, Operation,
};
use crate::tx_builder::output::{BuildOutput, DerivedAccount, OperationMetadata};

/// Human amount as sent by the host: JSON number or decimal text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn to_raw_units(&self, decimals: u8) -> Result<u64, TransactionBuilderError> {
        match self {
            AmountInput::Number(value) => to_raw_units_f64(*value, decimals),
            AmountInput::Text(text) => to_raw_units(text, decimals),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParams {
    #[serde(default)]
    pub amount: Option<AmountInput>,
    /// Symbol or mint; omitted means native SOL for transfers
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    /// Swap target token
    #[serde(default)]
    pub output_token: Option<String>,
}

/// Operation name plus its parameters
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRequest {
    pub operation: String,
    #[serde(default)]
    pub params: OperationParams,
}

/// Instructions and review metadata for one operation, before assembly
struct PlannedOperation {
    plans: Vec<InstructionPlan>,
    metadata: OperationMetadata,
    lookup_tables: Vec<AddressLookupTableAccount>,
}

/// Stateless builder bound to one configuration
pub struct TransactionBuilder {
    config: BuilderConfig,
    lending_program: Pubkey,
    lending_market: Pubkey,
    swap_programs: Vec<Pubkey>,
}

impl TransactionBuilder {
    pub fn new(config: BuilderConfig) -> Result<Self, TransactionBuilderError> {
        config.validate()?;
        Ok(Self {
            lending_program: config.lending_program_id()?,
            lending_market: config.lending_market()?,
            swap_programs: config.allowed_swap_programs()?,
            config,
        })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build an unsigned transaction for `request`
    pub fn build(
        &self,
        request: &OperationRequest,
        context: &PreparedContext,
        logger: &BuildLogger,
    ) -> Result<BuildOutput, TransactionBuilderError> {
        logger.log_build_started(&request.operation, &context.owner.to_string());
        self.build_inner(request, context, logger).map_err(|e| {
            logger.log_build_failed(&request.operation, &e);
            e
        })
    }

    /// Build from the plain-data context form
    pub fn build_from_dto(
        &self,
        request: &OperationRequest,
        context: PreparedContextDto,
        logger: &BuildLogger,
    ) -> Result<BuildOutput, TransactionBuilderError> {
        let context = PreparedContext::try_from(context).map_err(|e| {
            logger.log_build_failed(&request.operation, &e);
            e
        })?;
        self.build(request, &context, logger)
    }

    fn build_inner(
        &self,
        request: &OperationRequest,
        context: &PreparedContext,
        logger: &BuildLogger,
    ) -> Result<BuildOutput, TransactionBuilderError> {
        let operation = Operation::parse(&request.operation)?;
        let params = &request.params;

        let planned = match operation {
            Operation::Deposit | Operation::Withdraw => self.plan_lending(operation, params, context)?,
            Operation::Transfer => self.plan_transfer(params, context)?,
            Operation::Swap => self.plan_swap(params, context)?,
        };

        let mut plans = Vec::with_capacity(planned.plans.len() + 2);
        if !(operation == Operation::Swap && swap::has_compute_budget(&planned.plans)) {
            plans.extend(plan_compute_budget(&self.config.compute_budget));
        }
        plans.extend(planned.plans);

        let labels: Vec<&'static str> = plans.iter().map(|p| p.label).collect();
        logger.log_instructions_planned(operation.as_str(), &labels);

        let (transaction, advisories) = assemble(
            &context.owner,
            &context.lifetime,
            &plans,
            &planned.lookup_tables,
            &self.config.limits,
        )?;
        logger.log_build_succeeded(operation.as_str(), transaction.size, advisories.len());

        Ok(BuildOutput {
            request_id: Some(logger.request_id().to_string()),
            transaction,
            metadata: planned.metadata.with_instructions(&plans),
            advisories,
            blockhash: context.lifetime.blockhash.to_string(),
            last_valid_block_height: context.lifetime.last_valid_block_height,
        })
    }

    fn plan_lending(
        &self,
        operation: Operation,
        params: &OperationParams,
        context: &PreparedContext,
    ) -> Result<PlannedOperation, TransactionBuilderError> {
        let token = required_token(params, "token")?;
        let amount = required_amount(params, token.decimals())?;
        let lending = context
            .lending
            .as_ref()
            .ok_or_else(|| TransactionBuilderError::missing("lending context"))?;

        let plans = if operation == Operation::Deposit {
            lending::plan_deposit(
                &context.owner,
                lending,
                &self.lending_program,
                &self.lending_market,
                token,
                amount.raw,
            )?
        } else {
            lending::plan_withdraw(
                &context.owner,
                lending,
                &self.lending_program,
                &self.lending_market,
                token,
                amount.raw,
            )?
        };

        let accounts = vec![
            DerivedAccount::new("lending_market", &lending.market_address),
            DerivedAccount::new("reserve", &lending.reserve_address),
            DerivedAccount::new("obligation", &lending.obligation_address),
            DerivedAccount::new("user_liquidity", &lending.user_liquidity_account),
            DerivedAccount::new("user_collateral", &lending.user_collateral_account),
            DerivedAccount::new("collateral_mint", &lending.reserve.collateral_mint),
        ];

        Ok(PlannedOperation {
            plans,
            metadata: metadata(operation, token, amount, params, accounts),
            lookup_tables: Vec::new(),
        })
    }

    fn plan_transfer(
        &self,
        params: &OperationParams,
        context: &PreparedContext,
    ) -> Result<PlannedOperation, TransactionBuilderError> {
        let token = params.token.as_deref().map(Token::resolve).transpose()?;
        let asset = token.unwrap_or(Token::Sol);
        let amount = required_amount(params, asset.decimals())?;
        let recipient_text = params
            .recipient
            .as_deref()
            .ok_or_else(|| TransactionBuilderError::invalid_param("recipient", "required"))?;
        let recipient = parse_address(recipient_text)?;

        let plans = transfer::plan_transfer(
            &context.owner,
            &recipient,
            token,
            amount.raw,
            params.memo.as_deref(),
            context.transfer.as_ref(),
        )?;

        let mut accounts = vec![DerivedAccount::new("recipient", &recipient)];
        if !asset.is_native() {
            let resolved = transfer::verify_transfer_context(
                &context.owner,
                &recipient,
                asset,
                context.transfer.as_ref(),
            )?;
            accounts.push(DerivedAccount::new("source_token_account", &resolved.source));
            accounts.push(DerivedAccount::new("destination_token_account", &resolved.destination));
        }

        Ok(PlannedOperation {
            plans,
            metadata: metadata(Operation::Transfer, asset, amount, params, accounts),
            lookup_tables: Vec::new(),
        })
    }

    fn plan_swap(
        &self,
        params: &OperationParams,
        context: &PreparedContext,
    ) -> Result<PlannedOperation, TransactionBuilderError> {
        let input = required_token(params, "token")?;
        let output = params
            .output_token
            .as_deref()
            .ok_or_else(|| TransactionBuilderError::invalid_param("outputToken", "required"))
            .and_then(Token::resolve)?;
        let amount = required_amount(params, input.decimals())?;
        let quoted = context
            .swap
            .as_ref()
            .ok_or_else(|| TransactionBuilderError::missing("swap context"))?;

        let plans = swap::plan_swap(
            &context.owner,
            quoted,
            &self.swap_programs,
            input,
            output,
            amount.raw,
        )?;

        let accounts = vec![
            DerivedAccount::new("input_mint", &quoted.input_mint),
            DerivedAccount::new("output_mint", &quoted.output_mint),
        ];

        Ok(PlannedOperation {
            plans,
            metadata: metadata(Operation::Swap, input, amount, params, accounts),
            lookup_tables: quoted.lookup_tables.clone(),
        })
    }
}

fn required_token(
    params: &OperationParams,
    name: &'static str,
) -> Result<Token, TransactionBuilderError> {
    params
        .token
        .as_deref()
        .ok_or_else(|| TransactionBuilderError::invalid_param(name, "required"))
        .and_then(Token::resolve)
}

fn required_amount(
    params: &OperationParams,
    decimals: u8,
) -> Result<TokenAmount, TransactionBuilderError> {
    let input = params
        .amount
        .as_ref()
        .ok_or_else(|| TransactionBuilderError::invalid_param("amount", "required"))?;
    let raw = input.to_raw_units(decimals)?;
    if raw == 0 {
        return Err(TransactionBuilderError::invalid_param(
            "amount",
            "rounds to zero smallest units",
        ));
    }
    Ok(TokenAmount { raw, decimals })
}

fn metadata(
    operation: Operation,
    token: Token,
    amount: TokenAmount,
    params: &OperationParams,
    accounts: Vec<DerivedAccount>,
) -> OperationMetadata {
    OperationMetadata {
        operation,
        token: token.symbol().to_string(),
        mint: token.mint().to_string(),
        decimals: amount.decimals,
        amount: amount.to_decimal_string(),
        raw_amount: amount.raw.to_string(),
        recipient: params.recipient.clone(),
        memo: params.memo.clone().filter(|m| !m.is_empty()),
        output_token: params.output_token.clone(),
        accounts,
        instructions: Vec::new(),
    }
}

/// Build with a fresh request id
pub fn build_transaction(
    request: &OperationRequest,
    context: &PreparedContext,
    config: &BuilderConfig,
) -> Result<BuildOutput, TransactionBuilderError> {
    TransactionBuilder::new(config.clone())?.build(request, context, &BuildLogger::generate())
}
