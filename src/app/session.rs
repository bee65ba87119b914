//! Session lifecycle and the cooperative event loop
//!
//! A session runs on a single task. Link events, local commands and (on the
//! host) simulation ticks are handled one at a time by short, non-blocking
//! handlers; the only suspension point is waiting for the next event.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::camera::{CameraController, Point};
use crate::config::Config;
use crate::control::{ControlChannel, ControlEvent};
use crate::error::SessionError;
use crate::game::{AuthoritySimulation, Bounds, KinematicAuthority, Roster};
use crate::link::{FrameSubscription, LinkEvent, LinkMux, PeerChannel};
use crate::notify::{self, NotificationSink};
use crate::protocol::{PeerId, PlayerInput, Team};
use crate::sync::{
    select_source, FollowerStatus, FollowerSync, HostSync, LocalSimulationSource,
    NetworkMirrorSource, Role, StateSource,
};
use crate::util::time::{tick_delta, tick_duration};

/// Movement speed of the reference simulation, in board units per second
const PLAYER_SPEED: f32 = 300.0;

/// Requests handled by the session loop
#[derive(Debug)]
pub enum SessionCommand {
    /// Take ownership of an open channel to `peer`
    AttachPeer { peer: PeerId, channel: PeerChannel },
    Control(ControlEvent),
    SetSpectateTarget(Option<PeerId>),
    CycleSpectate { forward: bool },
    Input(PlayerInput),
    /// Host only
    SetTeam { id: PeerId, team: Team },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// The host went away; terminal
    HostLost,
    Closed,
}

/// Who this session is and whom it follows
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub local_id: PeerId,
    pub host_id: PeerId,
    pub name: String,
}

struct HostRole {
    sync: HostSync,
    roster: Roster,
    authority: Box<dyn AuthoritySimulation>,
}

impl HostRole {
    fn publish_roster(&mut self) {
        let game = self.roster.snapshot();
        self.authority.sync_roster(&game);
        if let Err(e) = self.sync.package_roster(game) {
            warn!(error = %e, "Failed to broadcast game frame");
        }
    }

    fn add_participant(
        &mut self,
        id: PeerId,
        name: String,
        local_id: &PeerId,
        sink: &dyn NotificationSink,
    ) {
        let is_local = &id == local_id;
        if let Err(e) = self.roster.join(id, name.clone()) {
            debug!(error = %e, "Join ignored");
            return;
        }
        self.publish_roster();
        if let Err(e) = self.sync.announce(&name, true) {
            warn!(error = %e, "Failed to broadcast join");
        }
        if !is_local {
            sink.notify(notify::join_left(&name, true));
        }
    }

    fn remove_participant(&mut self, id: &PeerId, sink: &dyn NotificationSink) {
        let participant = match self.roster.leave(id) {
            Ok(participant) => participant,
            Err(e) => {
                debug!(error = %e, "Leave ignored");
                return;
            }
        };
        self.publish_roster();
        if let Err(e) = self.sync.announce(&participant.name, false) {
            warn!(error = %e, "Failed to broadcast leave");
        }
        sink.notify(notify::join_left(&participant.name, false));
    }

    fn change_team(
        &mut self,
        id: &PeerId,
        team: Team,
        local_id: &PeerId,
        sink: &dyn NotificationSink,
    ) {
        match self.roster.set_team(id, team) {
            Ok(true) => {
                self.publish_roster();
                if id == local_id {
                    sink.notify(notify::team_change(team));
                }
            }
            Ok(false) => trace!(participant = %id, "Team unchanged"),
            Err(e) => warn!(participant = %id, error = %e, "Team change rejected"),
        }
    }
}

enum RoleState {
    Host(Box<HostRole>),
    Follower(FollowerSync),
}

/// Caller-side handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    local_id: PeerId,
    commands: mpsc::Sender<SessionCommand>,
    origin: watch::Receiver<Point>,
    status: watch::Receiver<SessionStatus>,
    source: Arc<dyn StateSource>,
}

impl SessionHandle {
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Active state for rendering. Snapshots are immutable; hold them freely.
    pub fn source(&self) -> &Arc<dyn StateSource> {
        &self.source
    }

    pub fn origin(&self) -> Point {
        *self.origin.borrow()
    }

    /// Notified only when the camera origin actually moves
    pub fn origin_updates(&self) -> watch::Receiver<Point> {
        self.origin.clone()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Wait until the session stops running
    pub async fn stopped(&self) -> SessionStatus {
        let mut status = self.status.clone();
        let stopped = match status.wait_for(|s| *s != SessionStatus::Running).await {
            Ok(s) => *s,
            Err(_) => SessionStatus::Closed,
        };
        stopped
    }
}

pub struct Session {
    config: Arc<Config>,
    params: SessionParams,
    link: Arc<LinkMux>,
    role: RoleState,
    source: Arc<dyn StateSource>,
    camera: CameraController,
    sink: Arc<dyn NotificationSink>,
    control: Box<dyn ControlChannel>,
    commands: mpsc::Receiver<SessionCommand>,
    origin_tx: watch::Sender<Point>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Session {
    /// Build a session; the role is fixed here from `(local_id, host_id)`
    pub fn new(
        config: Arc<Config>,
        params: SessionParams,
        control: Box<dyn ControlChannel>,
        sink: Arc<dyn NotificationSink>,
    ) -> (Self, SessionHandle) {
        let link = Arc::new(LinkMux::new(config.link_capacity));
        let local = Arc::new(LocalSimulationSource::new());
        let mirror = Arc::new(NetworkMirrorSource::new());
        let source = select_source(&params.local_id, &params.host_id, &local, &mirror);

        let role = match Role::of(&params.local_id, &params.host_id) {
            Role::Host => {
                let bounds = Bounds {
                    width: config.board_width,
                    height: config.board_height,
                    margin: config.player_size,
                };
                RoleState::Host(Box::new(HostRole {
                    sync: HostSync::new(link.clone(), local, config.input_rate_limit),
                    roster: Roster::new(params.host_id.clone(), config.max_per_team),
                    authority: Box::new(KinematicAuthority::new(
                        bounds,
                        PLAYER_SPEED,
                        rand::random(),
                    )),
                }))
            }
            Role::Follower => RoleState::Follower(FollowerSync::new(
                params.local_id.clone(),
                params.host_id.clone(),
                link.clone(),
                mirror,
                sink.clone(),
            )),
        };

        let (command_tx, command_rx) = mpsc::channel(config.link_capacity);
        let (origin_tx, origin_rx) = watch::channel(config.default_origin());
        let (status_tx, status_rx) = watch::channel(SessionStatus::Running);

        let handle = SessionHandle {
            local_id: params.local_id.clone(),
            commands: command_tx,
            origin: origin_rx,
            status: status_rx,
            source: source.clone(),
        };

        let session = Self {
            camera: CameraController::new(config.default_origin()),
            config,
            params,
            link,
            role,
            source,
            sink,
            control,
            commands: command_rx,
            origin_tx,
            status_tx,
        };

        (session, handle)
    }

    /// Replace the host's simulation. Followers ignore it.
    pub fn with_authority(mut self, authority: Box<dyn AuthoritySimulation>) -> Self {
        if let RoleState::Host(host) = &mut self.role {
            host.authority = authority;
        }
        self
    }

    pub fn role(&self) -> Role {
        match self.role {
            RoleState::Host(_) => Role::Host,
            RoleState::Follower(_) => Role::Follower,
        }
    }

    fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    /// Run until shutdown or host loss, then tear down
    pub async fn run(mut self) -> SessionStatus {
        let mut subscription = self.link.subscribe();
        let mut ticker = interval(tick_duration(self.config.tick_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let is_host = self.role() == Role::Host;

        info!(
            local = %self.params.local_id,
            host = %self.params.host_id,
            role = ?self.role(),
            "Session started"
        );

        if let RoleState::Host(host) = &mut self.role {
            let (id, name) = (self.params.local_id.clone(), self.params.name.clone());
            host.add_participant(id, name, &self.params.local_id, self.sink.as_ref());
        }

        loop {
            tokio::select! {
                Some(event) = subscription.recv() => self.on_link_event(event),
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => {
                        info!(local = %self.params.local_id, "Session shutdown requested");
                        break;
                    }
                    Some(command) => self.on_command(command),
                },
                _ = ticker.tick(), if is_host => self.on_tick(),
            }

            self.refresh_camera();

            if self.status() != SessionStatus::Running {
                break;
            }
        }

        self.teardown(subscription)
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match (&mut self.role, event) {
            (RoleState::Host(host), LinkEvent::PeerConnected(peer)) => {
                if let Err(e) = host.sync.welcome(&peer) {
                    warn!(peer = %peer, error = %e, "Failed to send game state to new peer");
                }
            }
            (RoleState::Host(host), LinkEvent::Frame { peer, bytes }) => {
                if let Some(input) = host.sync.handle_frame(&peer, &bytes) {
                    host.authority.apply_input(&peer, input);
                }
            }
            (RoleState::Host(host), LinkEvent::PeerDisconnected(peer)) => {
                host.sync.forget(&peer);
                host.remove_participant(&peer, self.sink.as_ref());
            }
            (RoleState::Follower(_), LinkEvent::PeerConnected(peer)) => {
                debug!(peer = %peer, "Peer connected");
            }
            (RoleState::Follower(sync), LinkEvent::Frame { peer, bytes }) => {
                let outcome = sync.handle_frame(&peer, &bytes);
                trace!(peer = %peer, ?outcome, "Frame handled");
            }
            (RoleState::Follower(sync), LinkEvent::PeerDisconnected(peer)) => {
                if sync.on_peer_disconnected(&peer) == FollowerStatus::HostLost {
                    self.status_tx.send_replace(SessionStatus::HostLost);
                }
            }
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::AttachPeer { peer, channel } => {
                if let Err(e) = self.link.attach(peer.clone(), channel) {
                    warn!(peer = %peer, error = %e, "Failed to attach peer channel");
                }
            }
            SessionCommand::Control(event) => self.on_control(event),
            SessionCommand::SetSpectateTarget(target) => {
                self.camera.set_spectate_target(target);
            }
            SessionCommand::CycleSpectate { forward } => {
                let game = self.source.game();
                let target = self.camera.cycle_target(&game, forward);
                debug!(target = ?target, "Spectate target changed");
            }
            SessionCommand::Input(input) => match &mut self.role {
                RoleState::Host(host) => host.authority.apply_input(&self.params.local_id, input),
                RoleState::Follower(sync) => {
                    if let Err(e) = sync.send_input(input) {
                        debug!(error = %e, "Input not sent");
                    }
                }
            },
            SessionCommand::SetTeam { id, team } => match &mut self.role {
                RoleState::Host(host) => {
                    host.change_team(&id, team, &self.params.local_id, self.sink.as_ref());
                }
                RoleState::Follower(_) => {
                    warn!(error = %SessionError::NotHost, "Team change ignored");
                }
            },
            // Handled by the loop before dispatch.
            SessionCommand::Shutdown => {}
        }
    }

    fn on_control(&mut self, event: ControlEvent) {
        match (&mut self.role, event) {
            (_, ControlEvent::Joined { game_id, assigned_id }) => {
                info!(game_id = %game_id, assigned_id = %assigned_id, "Joined game");
            }
            (RoleState::Host(host), ControlEvent::ParticipantJoined { id, name }) => {
                host.add_participant(id, name, &self.params.local_id, self.sink.as_ref());
            }
            (RoleState::Host(host), ControlEvent::ParticipantLeft { id }) => {
                host.remove_participant(&id, self.sink.as_ref());
            }
            (RoleState::Follower(_), event) => {
                // Membership on followers comes from the host's game frames.
                trace!(?event, "Follower ignores directory membership event");
            }
        }
    }

    fn on_tick(&mut self) {
        if let RoleState::Host(host) = &mut self.role {
            host.authority.step(tick_delta(self.config.tick_rate));
            if let Err(e) = host.sync.package_tick(host.authority.positions()) {
                warn!(error = %e, "Failed to broadcast positions");
            }
        }
    }

    fn refresh_camera(&mut self) {
        let game = self.source.game();
        let positions = self.source.positions();
        if let Some(origin) = self.camera.update(&self.params.local_id, &game, &positions) {
            self.origin_tx.send_replace(origin);
        }
    }

    /// Stop sending, release channels and clear mirrored state in one step
    fn teardown(&mut self, subscription: FrameSubscription) -> SessionStatus {
        self.link.close();
        drop(subscription);

        match &mut self.role {
            RoleState::Host(host) => host.sync.reset(),
            RoleState::Follower(sync) => sync.reset(),
        }
        self.camera.reset();
        self.origin_tx.send_replace(self.camera.origin());

        if let Err(e) = self.control.leave() {
            warn!(error = %e, "Failed to notify directory of leave");
        }

        let status = match self.status() {
            SessionStatus::Running => SessionStatus::Closed,
            other => other,
        };
        self.status_tx.send_replace(status);
        info!(local = %self.params.local_id, status = ?status, "Session ended");
        status
    }
}
