use crate::session::SessionStore;

/// Navigable surfaces of the application, one per router entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Register,
    Login,
    ForgotPassword,
    ResetPassword,
    AboutUs,
    Catalog,
    Profile,
    EditProfile,
    ChangePassword,
    PublicProfile,
    MeetingPoints,
    ExchangeHistory,
    AddBook,
    EditBook,
    BookDetail,
    MyBooks,
    ChatList,
    ChatConversation,
    ProposalsReceived,
    ProposalsSent,
    ProposalDetail,
    AdminDashboard,
    AdminUsers,
    AdminBooks,
    AdminReports,
}

/// Outcome of a guard check. Denials name where to send the visitor
/// instead; performing the navigation is the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied { redirect: Route },
}

impl Access {
    pub fn is_granted(self) -> bool {
        matches!(self, Access::Granted)
    }
}

/// Anonymous visitors are sent to the login page.
pub fn require_auth(session: &SessionStore) -> Access {
    if session.is_authenticated() {
        Access::Granted
    } else {
        Access::Denied {
            redirect: Route::Login,
        }
    }
}

/// Non-admins (guests included) are sent home.
pub fn require_admin(session: &SessionStore) -> Access {
    if session.is_admin() {
        Access::Granted
    } else {
        Access::Denied {
            redirect: Route::Home,
        }
    }
}

/// Admin accounts are kept on their own panel. Guests pass; whether they
/// may stay is [`require_auth`]'s decision.
pub fn forbid_admin(session: &SessionStore) -> Access {
    if session.is_admin() {
        Access::Denied {
            redirect: Route::AdminDashboard,
        }
    } else {
        Access::Granted
    }
}

impl Route {
    /// Path as the router spells it; `:` segments are parameters.
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Register => "/registro",
            Route::Login => "/login",
            Route::ForgotPassword => "/recuperar-password",
            Route::ResetPassword => "/reset-password/:token",
            Route::AboutUs => "/sobre-nosotros",
            Route::Catalog => "/catalogo",
            Route::Profile => "/perfil",
            Route::EditProfile => "/perfil/editar",
            Route::ChangePassword => "/perfil/cambiar-password",
            Route::PublicProfile => "/usuario/:id",
            Route::MeetingPoints => "/puntos-encuentro",
            Route::ExchangeHistory => "/historial",
            Route::AddBook => "/libros/nuevo",
            Route::EditBook => "/libros/:id/editar",
            Route::BookDetail => "/libros/:id",
            Route::MyBooks => "/mis-libros",
            Route::ChatList => "/chat",
            Route::ChatConversation => "/chat/:id",
            Route::ProposalsReceived => "/propuestas/recibidas",
            Route::ProposalsSent => "/propuestas/enviadas",
            Route::ProposalDetail => "/propuestas/:id",
            Route::AdminDashboard => "/admin",
            Route::AdminUsers => "/admin/users",
            Route::AdminBooks => "/admin/books",
            Route::AdminReports => "/admin/reports",
        }
    }

    /// Run this route's guard chain against the session. Guards run in
    /// router order; the first denial wins.
    pub fn check(self, session: &SessionStore) -> Access {
        for guard in self.guards() {
            if let denied @ Access::Denied { .. } = guard(session) {
                return denied;
            }
        }
        Access::Granted
    }

    fn guards(self) -> &'static [fn(&SessionStore) -> Access] {
        match self {
            // Public pages reachable while browsing anonymously, but not
            // meant for the admin account.
            Route::Home | Route::Catalog | Route::MeetingPoints | Route::BookDetail => {
                &[forbid_admin]
            }

            // Truly public pages.
            Route::Register
            | Route::Login
            | Route::ForgotPassword
            | Route::ResetPassword
            | Route::AboutUs => &[],

            // Member pages.
            Route::Profile
            | Route::EditProfile
            | Route::ChangePassword
            | Route::PublicProfile
            | Route::ExchangeHistory
            | Route::AddBook
            | Route::EditBook
            | Route::MyBooks
            | Route::ChatList
            | Route::ChatConversation
            | Route::ProposalsReceived
            | Route::ProposalsSent
            | Route::ProposalDetail => &[require_auth, forbid_admin],

            // Moderation panel.
            Route::AdminDashboard | Route::AdminUsers | Route::AdminBooks | Route::AdminReports => {
                &[require_admin]
            }
        }
    }
}
