use crate::{
    client::{
        error::ClientResult,
        session::{Session, SessionRepository},
    },
    models::{Booking, BookingId, Property, PropertyId},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingState {
    pub bookings: Vec<Booking>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyState {
    pub properties: Vec<Property>,
    pub selected_property_id: Option<PropertyId>,
    pub selected_property: Option<Property>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Everything the dashboard renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub auth: Session,
    pub bookings: BookingState,
    pub properties: PropertyState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SignedIn(Session),
    SignedOut,

    BookingsRequested,
    BookingsLoaded(Vec<Booking>),
    BookingsFailed(String),
    /// A single booking fetched or saved; replaces the stored copy or is appended.
    BookingStored(Booking),
    BookingRemoved(BookingId),

    PropertiesRequested,
    PropertiesLoaded(Vec<Property>),
    PropertiesFailed(String),
    PropertyLoaded(Property),
    PropertySaved,
    PropertyRemoved(PropertyId),
    PropertySelected(Option<PropertyId>),
}

/// Pure transition function; persistence is left to [`Store::dispatch`].
pub fn reduce(mut state: DashboardState, action: &Action) -> DashboardState {
    match action {
        Action::SignedIn(session) => {
            state.auth = Session {
                is_authenticated: true,
                ..session.clone()
            };
        }
        Action::SignedOut => state.auth = Session::default(),

        Action::BookingsRequested => {
            state.bookings.loading = true;
            state.bookings.error = None;
        }
        Action::BookingsLoaded(bookings) => {
            state.bookings.loading = false;
            state.bookings.bookings = bookings.clone();
        }
        Action::BookingsFailed(message) => {
            state.bookings.loading = false;
            state.bookings.error = Some(message.clone());
        }
        Action::BookingStored(booking) => {
            state.bookings.loading = false;
            match state
                .bookings
                .bookings
                .iter_mut()
                .find(|existing| existing.id == booking.id)
            {
                Some(existing) => *existing = booking.clone(),
                None => state.bookings.bookings.push(booking.clone()),
            }
        }
        Action::BookingRemoved(booking_id) => {
            state
                .bookings
                .bookings
                .retain(|booking| booking.id != *booking_id);
        }

        Action::PropertiesRequested => {
            state.properties.loading = true;
            state.properties.error = None;
        }
        Action::PropertiesLoaded(properties) => {
            state.properties.loading = false;
            state.properties.properties = properties.clone();
        }
        Action::PropertiesFailed(message) => {
            state.properties.loading = false;
            state.properties.error = Some(message.clone());
        }
        Action::PropertyLoaded(property) => {
            state.properties.loading = false;
            state.properties.selected_property = Some(property.clone());
        }
        Action::PropertySaved => state.properties.loading = false,
        Action::PropertyRemoved(property_id) => {
            state.properties.loading = false;
            state
                .properties
                .properties
                .retain(|property| property.id != *property_id);
            state
                .bookings
                .bookings
                .retain(|booking| booking.property_id != *property_id);
            if state.properties.selected_property_id == Some(*property_id) {
                state.properties.selected_property_id = None;
                state.properties.selected_property = None;
            }
        }
        Action::PropertySelected(property_id) => {
            state.properties.selected_property_id = *property_id;
        }
    }
    state
}

/// Owns the dashboard state and keeps the auth slice in sync with the
/// session repository.
pub struct Store<R: SessionRepository> {
    state: DashboardState,
    sessions: R,
}

impl<R: SessionRepository> Store<R> {
    /// Starts from the persisted session, if there is one.
    pub fn open(sessions: R) -> ClientResult<Self> {
        let auth = sessions.load()?.unwrap_or_default();
        Ok(Self {
            state: DashboardState {
                auth,
                ..DashboardState::default()
            },
            sessions,
        })
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        Some(&self.state.auth).filter(|session| session.is_authenticated)
    }

    pub fn dispatch(&mut self, action: Action) -> ClientResult<&DashboardState> {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, &action);

        match action {
            Action::SignedIn(_) => self.sessions.save(&self.state.auth)?,
            Action::SignedOut => self.sessions.clear()?,
            _ => {}
        }
        Ok(&self.state)
    }
}
