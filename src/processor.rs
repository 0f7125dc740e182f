use crate::coordinator::{coordinator_authority, CpiCoordinator};
use crate::error::RaffleError;
use crate::instruction::RaffleInstruction;
use crate::oracle::SwitchboardFeed;
use crate::price::quote_tickets;
use crate::settlement::FundsTransfer;
use crate::state::{Config, RaffleParams, RaffleState};
use crate::utils::{find_config_address, find_raffle_address, CONFIG_SEED, RAFFLE_SEED};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { params } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, params, program_id)
            }
            RaffleInstruction::BuyTickets {
                ticket_count,
                payment,
            } => {
                msg!("Instruction: Buy Tickets");
                Self::process_buy_tickets(accounts, ticket_count, payment, program_id)
            }
            RaffleInstruction::RequestRandomness {} => {
                msg!("Instruction: Request Randomness");
                Self::process_request_randomness(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
            RaffleInstruction::QuoteTickets { ticket_count } => {
                msg!("Instruction: Quote Tickets");
                Self::process_quote_tickets(accounts, ticket_count, program_id)
            }
        }
    }

    /// Creates the config and raffle state accounts and opens round 0.
    /// Can only run once per program.
    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        params: RaffleParams,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let (expected_config, config_bump) = find_config_address(program_id);
        let (expected_raffle, raffle_bump) = find_raffle_address(program_id);
        if *config_info.key != expected_config || *raffle_info.key != expected_raffle {
            msg!("Invalid config or raffle account address");
            return Err(ProgramError::InvalidArgument);
        }

        if config_info.owner == program_id || raffle_info.owner == program_id {
            msg!("Raffle is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        if let Err(e) = params.validate() {
            msg!("Rejected raffle parameters");
            return Err(e.into());
        }

        let rent = Rent::get()?;
        Self::create_pda_account(
            payer_info,
            config_info,
            system_program_info,
            rent.minimum_balance(Config::LEN),
            Config::LEN,
            &[CONFIG_SEED, &[config_bump]],
            program_id,
        )?;
        Self::create_pda_account(
            payer_info,
            raffle_info,
            system_program_info,
            rent.minimum_balance(RaffleState::LEN),
            RaffleState::LEN,
            &[RAFFLE_SEED, &[raffle_bump]],
            program_id,
        )?;

        let config = Config::new(
            &params,
            coordinator_authority(&params.vrf_coordinator),
            config_bump,
            raffle_bump,
        );
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        let now = Clock::get()?.unix_timestamp;
        RaffleState::new(now).store(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: price {} fiat units, interval {}s, beneficiary {} ({} bps)",
            config.ticket_price_fiat,
            config.round_interval,
            config.beneficiary,
            config.beneficiary_share_bps
        );
        Ok(())
    }

    fn process_buy_tickets(
        accounts: &[AccountInfo],
        ticket_count: u64,
        payment: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let buyer_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let native_feed_info = next_account_info(account_info_iter)?;
        let fiat_feed_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !buyer_info.is_signer {
            msg!("Buyer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(config_info, program_id)?;
        let mut state = Self::load_state(raffle_info, &config, program_id)?;
        let native_usd = SwitchboardFeed::new(native_feed_info, &config.native_usd_feed)?;
        let fiat_usd = SwitchboardFeed::new(fiat_feed_info, &config.fiat_usd_feed)?;
        let now = Clock::get()?.unix_timestamp;

        let purchase = state.buy_tickets(
            &config,
            &native_usd,
            &fiat_usd,
            now,
            *buyer_info.key,
            ticket_count,
            payment,
        )?;
        state.store(&mut raffle_info.data.borrow_mut())?;

        invoke(
            &system_instruction::transfer(buyer_info.key, raffle_info.key, purchase.paid),
            &[
                buyer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        msg!(
            "{} bought {} tickets in round {} for {} lamports, pot is {}",
            buyer_info.key,
            purchase.ticket_count,
            purchase.round_id,
            purchase.paid,
            state.pot()
        );
        Ok(())
    }

    fn process_request_randomness(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let forwarded = account_info_iter.as_slice();

        // Anyone can close the round once the interval elapsed
        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(config_info, program_id)?;
        let mut state = Self::load_state(raffle_info, &config, program_id)?;

        if *coordinator_info.key != config.vrf_coordinator {
            msg!("Coordinator {} is not the configured one", coordinator_info.key);
            return Err(ProgramError::IncorrectProgramId);
        }

        let now = Clock::get()?.unix_timestamp;
        let mut coordinator = CpiCoordinator {
            program: coordinator_info,
            consumer_program: *program_id,
            accounts: forwarded,
        };
        let request_id = state.request_randomness(&config, now, &mut coordinator)?;
        state.store(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Round {} closed with {} tickets, randomness request {}",
            state.current_round_id(),
            state.total_tickets(),
            request_id
        );
        Ok(())
    }

    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[[u8; 32]],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let recipients = account_info_iter.as_slice();

        if !authority_info.is_signer {
            msg!("Coordinator authority must sign the callback");
            return Err(RaffleError::UnauthorizedCaller.into());
        }

        let config = Self::load_config(config_info, program_id)?;
        if *authority_info.key != config.coordinator_authority {
            msg!("{} is not the coordinator authority", authority_info.key);
            return Err(RaffleError::UnauthorizedCaller.into());
        }
        let mut state = Self::load_state(raffle_info, &config, program_id)?;

        if recipients.first().map(|info| info.key) != Some(&config.beneficiary) {
            msg!("Beneficiary account must follow the raffle account");
            return Err(ProgramError::InvalidArgument);
        }

        let now = Clock::get()?.unix_timestamp;
        let rent = Rent::get()?;
        let mut payout = PotPayout {
            pot: raffle_info,
            reserve: rent.minimum_balance(raffle_info.data_len()),
            rent,
            recipients,
        };
        let receipt = state.fulfill_randomness(
            &config,
            authority_info.key,
            request_id,
            random_words,
            now,
            &mut payout,
        )?;
        state.store(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Request {} fulfilled, round {} opened",
            request_id,
            state.current_round_id()
        );
        msg!("Winner of round {}: {}", receipt.round_id, receipt.winner);
        Ok(())
    }

    fn process_quote_tickets(
        accounts: &[AccountInfo],
        ticket_count: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let config_info = next_account_info(account_info_iter)?;
        let native_feed_info = next_account_info(account_info_iter)?;
        let fiat_feed_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(config_info, program_id)?;
        let native_usd = SwitchboardFeed::new(native_feed_info, &config.native_usd_feed)?;
        let fiat_usd = SwitchboardFeed::new(fiat_feed_info, &config.fiat_usd_feed)?;
        let now = Clock::get()?.unix_timestamp;

        let amount = quote_tickets(&config, &native_usd, &fiat_usd, now, ticket_count)?;
        set_return_data(&amount.to_le_bytes());

        msg!("{} tickets cost {} lamports", ticket_count, amount);
        Ok(())
    }

    fn create_pda_account<'a>(
        payer_info: &AccountInfo<'a>,
        new_account_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        lamports: u64,
        space: usize,
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> ProgramResult {
        invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                new_account_info.key,
                lamports,
                space as u64,
                program_id,
            ),
            &[
                payer_info.clone(),
                new_account_info.clone(),
                system_program_info.clone(),
            ],
            &[seeds],
        )
    }

    fn load_config(config_info: &AccountInfo, program_id: &Pubkey) -> Result<Config, ProgramError> {
        if config_info.owner != program_id {
            msg!("Config account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let config = Config::unpack(&config_info.data.borrow())?;
        let expected =
            Pubkey::create_program_address(&[CONFIG_SEED, &[config.config_bump]], program_id)?;
        if *config_info.key != expected {
            msg!("Invalid config account address");
            return Err(ProgramError::InvalidArgument);
        }
        Ok(config)
    }

    fn load_state(
        raffle_info: &AccountInfo,
        config: &Config,
        program_id: &Pubkey,
    ) -> Result<RaffleState, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let expected =
            Pubkey::create_program_address(&[RAFFLE_SEED, &[config.state_bump]], program_id)?;
        if *raffle_info.key != expected {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        if !raffle_info.is_writable {
            return Err(ProgramError::InvalidArgument);
        }
        let state = RaffleState::load(&raffle_info.data.borrow())?;
        Ok(state)
    }
}

/// Pays out of the lamports held by the raffle state account, keeping its
/// rent-exempt reserve untouched. Recipients must end up rent exempt.
struct PotPayout<'a, 'info> {
    pot: &'a AccountInfo<'info>,
    reserve: u64,
    rent: Rent,
    recipients: &'a [AccountInfo<'info>],
}

impl<'a, 'info> FundsTransfer for PotPayout<'a, 'info> {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> ProgramResult {
        let recipient_info = self
            .recipients
            .iter()
            .find(|info| info.key == recipient)
            .ok_or_else(|| {
                msg!("Account {} was not passed to the callback", recipient);
                ProgramError::NotEnoughAccountKeys
            })?;
        if !recipient_info.is_writable {
            msg!("Account {} must be writable", recipient);
            return Err(ProgramError::InvalidArgument);
        }

        let remaining = self
            .pot
            .lamports()
            .checked_sub(amount)
            .filter(|left| *left >= self.reserve)
            .ok_or(ProgramError::InsufficientFunds)?;
        let credited = recipient_info
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        if !self.rent.is_exempt(credited, recipient_info.data_len()) {
            msg!(
                "{} would hold {} lamports, below the rent-exempt minimum of {}",
                recipient,
                credited,
                self.rent.minimum_balance(recipient_info.data_len())
            );
            return Err(RaffleError::RecipientNotRentExempt.into());
        }

        **self.pot.try_borrow_mut_lamports()? = remaining;
        **recipient_info.try_borrow_mut_lamports()? = credited;

        msg!("Transferred {} lamports to {}", amount, recipient);
        Ok(())
    }
}
