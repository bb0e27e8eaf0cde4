//! Read session - pair with a thermostat and capture its state
//!
//! The thermostat protocol is an ordered walk through a fixed set of steps.
//! Each [`State`] carries exactly what the following steps need, so a step
//! cannot run before the data it depends on exists. [`Step`] is the data-less
//! view of the same graph and answers policy questions about it.
//!
//! A session mutates a working copy of the thermostat record. The registry is
//! only touched after the peripheral was disconnected, by committing that copy
//! and saving the whole registry. Any error before that drops the copy.

use eco2_proto::ble::{
    BATTERY_LEVEL_UUID, BATTERY_SERVICE_UUID, DEVICE_NAME_UUID, MAIN_SERVICE_UUID, PIN_CODE_UUID,
    SCHEDULE_1_UUID, SCHEDULE_2_UUID, SCHEDULE_3_UUID, SECRET_KEY_UUID, SETTINGS_UUID,
    TEMPERATURE_UUID, UNLOCK_PIN, characteristic_label,
};
use uuid::Uuid;

use crate::accessor::{
    Characteristic, ConnectedPeripheral, PeripheralAccessor, Service, characteristic_with_uuid,
};
use crate::error::SyncError;
use crate::registry::Registry;
use crate::thermostat::{Field, Thermostat};

/// Steps of a read session, in protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Connect,
    DiscoverMainService,
    DiscoverBatteryService,
    EnumerateMainCharacteristics,
    CheckAuthentication,
    Unlock,
    EnumerateBatteryCharacteristics,
    Capture,
    UpdateIdentity,
    Disconnect,
    /// Saving the registry, done by [`read_thermostat`] once the session ended
    Persist,
    /// Recorded after a successful save, never driven by the session loop
    Done,
}

/// What happens when a step does not find the service or characteristic it
/// looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// The session ends with an error and nothing is saved
    Abort,
    /// The affected field is left empty and the session goes on
    Absent,
}

impl Step {
    pub const ORDER: [Step; 12] = [
        Step::Connect,
        Step::DiscoverMainService,
        Step::DiscoverBatteryService,
        Step::EnumerateMainCharacteristics,
        Step::CheckAuthentication,
        Step::Unlock,
        Step::EnumerateBatteryCharacteristics,
        Step::Capture,
        Step::UpdateIdentity,
        Step::Disconnect,
        Step::Persist,
        Step::Done,
    ];

    /// The step that follows a successful `self`
    pub fn next(self) -> Option<Step> {
        let index = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    pub fn on_missing(self) -> OnMissing {
        match self {
            Step::Capture => OnMissing::Absent,
            _ => OnMissing::Abort,
        }
    }

    /// Whether the step changes the working copy of the record
    pub fn mutates_record(self) -> bool {
        matches!(self, Step::Capture | Step::UpdateIdentity)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Connect => "connect",
            Step::DiscoverMainService => "discover main service",
            Step::DiscoverBatteryService => "discover battery service",
            Step::EnumerateMainCharacteristics => "enumerate main service characteristics",
            Step::CheckAuthentication => "check authentication",
            Step::Unlock => "unlock",
            Step::EnumerateBatteryCharacteristics => "enumerate battery service characteristics",
            Step::Capture => "capture",
            Step::UpdateIdentity => "update identity",
            Step::Disconnect => "disconnect",
            Step::Persist => "persist",
            Step::Done => "done",
        };
        f.write_str(name)
    }
}

/// Which service a captured characteristic belongs to
#[derive(Debug, Clone, Copy)]
enum Source {
    Main,
    Battery,
}

/// Fields read on every session after the secret key, in read order
const CAPTURES: [(Field, Source, Uuid); 7] = [
    (Field::BatteryLevel, Source::Battery, BATTERY_LEVEL_UUID),
    (Field::Name, Source::Main, DEVICE_NAME_UUID),
    (Field::Temperature, Source::Main, TEMPERATURE_UUID),
    (Field::Settings, Source::Main, SETTINGS_UUID),
    (Field::Schedule1, Source::Main, SCHEDULE_1_UUID),
    (Field::Schedule2, Source::Main, SCHEDULE_2_UUID),
    (Field::Schedule3, Source::Main, SCHEDULE_3_UUID),
];

/// Connection plus the two services every later step talks to
struct Link {
    peripheral: ConnectedPeripheral,
    main: Service,
    battery: Service,
}

/// Main service characteristics, and the secret key one if it is exposed
struct Gate {
    main: Vec<Characteristic>,
    secret: Option<Characteristic>,
}

enum State {
    Connect,
    DiscoverMainService(ConnectedPeripheral),
    DiscoverBatteryService(ConnectedPeripheral, Service),
    EnumerateMainCharacteristics(Link),
    CheckAuthentication(Link, Vec<Characteristic>),
    Unlock(Link, Gate),
    EnumerateBatteryCharacteristics(Link, Gate),
    Capture(Link, Gate, Vec<Characteristic>),
    UpdateIdentity(Link),
    Disconnect,
}

impl State {
    fn step(&self) -> Step {
        match self {
            State::Connect => Step::Connect,
            State::DiscoverMainService(..) => Step::DiscoverMainService,
            State::DiscoverBatteryService(..) => Step::DiscoverBatteryService,
            State::EnumerateMainCharacteristics(..) => Step::EnumerateMainCharacteristics,
            State::CheckAuthentication(..) => Step::CheckAuthentication,
            State::Unlock(..) => Step::Unlock,
            State::EnumerateBatteryCharacteristics(..) => Step::EnumerateBatteryCharacteristics,
            State::Capture(..) => Step::Capture,
            State::UpdateIdentity(..) => Step::UpdateIdentity,
            State::Disconnect => Step::Disconnect,
        }
    }
}

/// What a finished session learned
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// The record as saved
    pub thermostat: Thermostat,
    /// A non-empty secret key was read this session
    pub secret_read: bool,
    /// Optional fields whose characteristic the thermostat did not expose
    pub absent: Vec<Field>,
    /// Steps taken, in order
    pub steps: Vec<Step>,
}

/// One connection to one thermostat, driving a working copy of its record
///
/// `run` covers everything up to and including the disconnect. Saving is
/// the caller's job, see [`read_thermostat`].
pub struct Session<'a, A: ?Sized> {
    accessor: &'a mut A,
    thermostat: &'a mut Thermostat,
    secret_read: bool,
    absent: Vec<Field>,
    steps: Vec<Step>,
}

/// Outcome of [`Session::run`], whose steps end with the disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub secret_read: bool,
    pub absent: Vec<Field>,
    pub steps: Vec<Step>,
}

impl<'a, A: PeripheralAccessor + ?Sized> Session<'a, A> {
    pub fn new(accessor: &'a mut A, thermostat: &'a mut Thermostat) -> Self {
        Self {
            accessor,
            thermostat,
            secret_read: false,
            absent: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub async fn run(mut self) -> Result<SessionOutcome, SyncError> {
        let mut state = State::Connect;
        loop {
            let step = state.step();
            tracing::debug!(%step, "session step");
            self.steps.push(step);
            match self.advance(state).await? {
                Some(next) => state = next,
                None => break,
            }
        }

        Ok(SessionOutcome {
            secret_read: self.secret_read,
            absent: self.absent,
            steps: self.steps,
        })
    }

    /// Run one step, `None` once the peripheral was disconnected
    async fn advance(&mut self, state: State) -> Result<Option<State>, SyncError> {
        let next = match state {
            State::Connect => {
                let serial = self.thermostat.serial.clone();
                let peripheral = self
                    .accessor
                    .connect(&serial, self.thermostat.uuid.as_deref())
                    .await
                    .map_err(SyncError::transport(Step::Connect))?;
                tracing::info!(id = %peripheral.id, "connected");
                State::DiscoverMainService(peripheral)
            }
            State::DiscoverMainService(peripheral) => {
                let main = find_service(&peripheral, MAIN_SERVICE_UUID)?;
                State::DiscoverBatteryService(peripheral, main)
            }
            State::DiscoverBatteryService(peripheral, main) => {
                let battery = find_service(&peripheral, BATTERY_SERVICE_UUID)?;
                State::EnumerateMainCharacteristics(Link {
                    peripheral,
                    main,
                    battery,
                })
            }
            State::EnumerateMainCharacteristics(link) => {
                let characteristics = self
                    .accessor
                    .discover_characteristics(&link.main)
                    .await
                    .map_err(SyncError::transport(Step::EnumerateMainCharacteristics))?;
                State::CheckAuthentication(link, characteristics)
            }
            State::CheckAuthentication(link, main) => {
                let secret = characteristic_with_uuid(&main, SECRET_KEY_UUID).cloned();
                if secret.is_none() && !self.thermostat.has_secret_and_uuid() {
                    return Err(SyncError::AuthenticationRequired {
                        serial: self.thermostat.serial.clone(),
                    });
                }
                if secret.is_none() {
                    tracing::info!("secret key not exposed, using the stored one");
                }
                State::Unlock(link, Gate { main, secret })
            }
            State::Unlock(link, gate) => {
                let pin_code = required_characteristic(&gate.main, PIN_CODE_UUID)?;
                // One shot: a failed unlock write ends the session, it is never retried.
                tracing::info!("writing pin code");
                self.accessor
                    .write_characteristic_value(&link.main, pin_code, &UNLOCK_PIN)
                    .await
                    .map_err(SyncError::transport(Step::Unlock))?;
                tracing::info!("wrote pin code");
                State::EnumerateBatteryCharacteristics(link, gate)
            }
            State::EnumerateBatteryCharacteristics(link, gate) => {
                let battery = self
                    .accessor
                    .discover_characteristics(&link.battery)
                    .await
                    .map_err(SyncError::transport(Step::EnumerateBatteryCharacteristics))?;
                tracing::info!("discovered battery service characteristics");
                State::Capture(link, gate, battery)
            }
            State::Capture(link, gate, battery) => {
                self.capture(&link, &gate, &battery).await?;
                State::UpdateIdentity(link)
            }
            State::UpdateIdentity(link) => {
                self.thermostat.uuid = Some(link.peripheral.id);
                State::Disconnect
            }
            State::Disconnect => {
                self.accessor
                    .disconnect()
                    .await
                    .map_err(SyncError::transport(Step::Disconnect))?;
                return Ok(None);
            }
        };
        Ok(Some(next))
    }

    async fn capture(
        &mut self,
        link: &Link,
        gate: &Gate,
        battery: &[Characteristic],
    ) -> Result<(), SyncError> {
        if let Some(secret) = &gate.secret {
            let value = self.read(&link.main, secret).await?;
            if value.is_empty() {
                // An empty read never replaces a learned secret.
                tracing::warn!("secret key read back empty, keeping the stored one");
            } else {
                self.thermostat.set_field(Field::SecretKey, Some(value));
                self.secret_read = true;
            }
        }

        for (field, source, uuid) in CAPTURES {
            let (service, characteristics) = match source {
                Source::Main => (&link.main, gate.main.as_slice()),
                Source::Battery => (&link.battery, battery),
            };

            let value = match characteristic_with_uuid(characteristics, uuid) {
                Some(characteristic) => Some(self.read(service, characteristic).await?),
                None => {
                    tracing::warn!(
                        %field,
                        %uuid,
                        "characteristic not exposed, leaving field empty"
                    );
                    self.absent.push(field);
                    None
                }
            };
            self.thermostat.set_field(field, value);
        }

        Ok(())
    }

    async fn read(
        &mut self,
        service: &Service,
        characteristic: &Characteristic,
    ) -> Result<String, SyncError> {
        tracing::debug!(
            uuid = %characteristic.uuid,
            label = characteristic_label(&characteristic.uuid).unwrap_or("unknown"),
            "reading characteristic"
        );
        let bytes = self
            .accessor
            .read_characteristic_value(service, characteristic)
            .await
            .map_err(SyncError::transport(Step::Capture))?;
        Ok(eco2_proto::encode_value(&bytes))
    }
}

fn find_service(peripheral: &ConnectedPeripheral, uuid: Uuid) -> Result<Service, SyncError> {
    peripheral
        .service(uuid)
        .cloned()
        .ok_or(SyncError::ServiceNotFound { uuid })
}

fn required_characteristic(
    characteristics: &[Characteristic],
    uuid: Uuid,
) -> Result<&Characteristic, SyncError> {
    characteristic_with_uuid(characteristics, uuid).ok_or(SyncError::CharacteristicNotFound {
        label: characteristic_label(&uuid).unwrap_or("required"),
        uuid,
    })
}

/// Read thermostat `serial` and save what was learned
///
/// The registry, in memory and on disk, is only changed when the whole
/// session succeeded and the save went through.
#[tracing::instrument(skip(accessor, registry))]
pub async fn read_thermostat<A>(
    accessor: &mut A,
    registry: &mut Registry,
    serial: &str,
) -> Result<SyncReport, SyncError>
where
    A: PeripheralAccessor + ?Sized,
{
    let mut draft = registry.snapshot(serial);
    let mut outcome = Session::new(accessor, &mut draft).run().await?;

    let mut next = registry.clone();
    next.commit(draft.clone());
    if let Err(source) = next.save() {
        return Err(SyncError::Persistence {
            thermostat: Box::new(draft),
            source,
        });
    }
    *registry = next;
    outcome.steps.extend([Step::Persist, Step::Done]);
    tracing::info!(path = %registry.path().display(), "saved thermostat");

    Ok(SyncReport {
        thermostat: draft,
        secret_read: outcome.secret_read,
        absent: outcome.absent,
        steps: outcome.steps,
    })
}
