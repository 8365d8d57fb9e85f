use statig::prelude::*;

use super::status::{ConnectivityMode, ConnectivityStatus};
use super::{ApplyStatus, LinkAction, LinkActions, LinkEvent};

#[derive(Clone, Copy, Debug)]
pub(super) struct ConnectivityMachine {
    pub(super) status: ConnectivityStatus,
}

#[derive(Debug)]
pub(super) struct DispatchContext {
    pub(super) status: ApplyStatus,
    pub(super) actions: LinkActions,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: ApplyStatus::Unchanged,
            actions: LinkActions::new(),
        }
    }
}

impl DispatchContext {
    fn emit(&mut self, action: LinkAction) {
        let _ = self.actions.push(action);
    }
}

impl ConnectivityMachine {
    pub(super) fn new() -> Self {
        Self {
            status: ConnectivityStatus::initial(),
        }
    }

    fn link_lost(&mut self, context: &mut DispatchContext) {
        self.status.mode = ConnectivityMode::Connecting;
        self.status.retry_count = self.status.retry_count.saturating_add(1);
        context.emit(LinkAction::Reconnect {
            attempt: self.status.retry_count,
        });
        context.status = ApplyStatus::Applied;
    }
}

#[state_machine(initial = "State::booting()")]
impl ConnectivityMachine {
    #[state]
    fn booting(&mut self, context: &mut DispatchContext, event: &LinkEvent) -> Outcome<State> {
        match event {
            LinkEvent::Boot {
                has_credentials: true,
            } => {
                self.status.mode = ConnectivityMode::Connecting;
                context.emit(LinkAction::StartStation);
                context.status = ApplyStatus::Applied;
                Transition(State::connecting())
            }
            LinkEvent::Boot {
                has_credentials: false,
            } => {
                self.status.mode = ConnectivityMode::Provisioning;
                context.emit(LinkAction::StartAccessPoint);
                context.emit(LinkAction::StartCaptivePortal);
                context.status = ApplyStatus::Applied;
                Transition(State::provisioning())
            }
            _ => {
                context.status = ApplyStatus::InvalidTransition;
                Handled
            }
        }
    }

    // Terminal for this boot; only a restart leaves it.
    #[state]
    fn provisioning(&mut self, context: &mut DispatchContext, event: &LinkEvent) -> Outcome<State> {
        context.status = match event {
            LinkEvent::Boot { .. } => ApplyStatus::InvalidTransition,
            _ => ApplyStatus::Unchanged,
        };
        Handled
    }

    #[state]
    fn connecting(&mut self, context: &mut DispatchContext, event: &LinkEvent) -> Outcome<State> {
        match event {
            LinkEvent::AddressAcquired => {
                self.status.mode = ConnectivityMode::Connected;
                self.status.retry_count = 0;
                context.status = ApplyStatus::Applied;
                Transition(State::connected())
            }
            LinkEvent::Disconnected => {
                self.link_lost(context);
                Handled
            }
            LinkEvent::Boot { .. } => {
                context.status = ApplyStatus::InvalidTransition;
                Handled
            }
        }
    }

    #[state]
    fn connected(&mut self, context: &mut DispatchContext, event: &LinkEvent) -> Outcome<State> {
        match event {
            LinkEvent::AddressAcquired => {
                context.status = ApplyStatus::Unchanged;
                Handled
            }
            LinkEvent::Disconnected => {
                self.link_lost(context);
                Transition(State::connecting())
            }
            LinkEvent::Boot { .. } => {
                context.status = ApplyStatus::InvalidTransition;
                Handled
            }
        }
    }
}
