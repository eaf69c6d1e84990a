//! The stub backend's whole world: users, listings and the negotiation
//! graph behind one mutex, plus hit counters the tests read afterwards.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard};

use cambioteca_types::models::{
    Book, BookImage, BookRef, BookReport, Comuna, ConversationSummary, ExchangeStatus, Genre,
    MEETING_PLACE_UNSET, MeetingStatus, Message, Offer, Proposal, ProposalStatus, Region, User,
    UserMetrics, UserRating, UserRef,
};
use cambioteca_types::models as wire;
use chrono::{DateTime, Utc};

/// Fixture ids stay below this; everything created at runtime counts up
/// from here.
const FIRST_DYNAMIC_ID: i64 = 100;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub market: Mutex<MarketState>,
    pub hits: Hits,
}

impl AppStateInner {
    pub fn market(&self) -> MutexGuard<'_, MarketState> {
        self.market.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How many times each read endpoint was hit. Lets a test assert that a
/// dropped controller stopped polling.
#[derive(Debug, Default)]
pub struct Hits {
    pub book_lists: AtomicU64,
    pub proposal_lists: AtomicU64,
    pub conversation_lists: AtomicU64,
    pub message_lists: AtomicU64,
    pub seen_marks: AtomicU64,
    pub meeting_probes: AtomicU64,
    pub rating_probes: AtomicU64,
}

pub struct UserRecord {
    pub user: User,
    pub password: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct OfferRecord {
    pub id: i64,
    pub book_id: i64,
}

#[derive(Debug, Clone)]
pub struct ProposalRecord {
    pub id: i64,
    pub status: ProposalStatus,
    pub requester_id: i64,
    pub recipient_id: i64,
    pub requested_book_id: i64,
    pub offers: Vec<OfferRecord>,
    pub accepted_book_id: Option<i64>,
    pub conversation_id: Option<i64>,
    pub exchange_id: Option<i64>,
}

/// Where the meeting negotiation stands for one exchange. `place` stays
/// empty until the offerer proposes; a rejected place clears it again.
#[derive(Debug, Clone)]
pub struct MeetingState {
    pub status: MeetingStatus,
    pub place: Option<String>,
    pub time: Option<String>,
}

impl Default for MeetingState {
    fn default() -> Self {
        Self {
            status: MeetingStatus::Pending,
            place: None,
            time: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// One accepted proposal turned into a live exchange. The offerer is the
/// user whose book was requested; the requester initiated the proposal.
#[derive(Debug, Clone)]
pub struct ExchangeEntry {
    pub id: i64,
    pub proposal_id: i64,
    pub offerer_id: i64,
    pub requester_id: i64,
    /// The offerer's book, the one that was requested.
    pub requested_book_id: i64,
    /// The requester's book, the one that was accepted in return.
    pub offered_book_id: i64,
    pub completed: bool,
    pub meeting: MeetingState,
    pub code: Option<IssuedCode>,
}

pub struct ConversationRecord {
    pub id: i64,
    pub exchange_id: i64,
    pub participants: [i64; 2],
    pub messages: Vec<Message>,
    /// Last message id each participant marked seen.
    pub seen: HashMap<i64, i64>,
}

pub struct RatingRecord {
    pub exchange_id: i64,
    pub rater_id: i64,
    pub ratee_id: i64,
    pub score: u8,
    pub comment: String,
}

pub struct MarketState {
    next_id: i64,
    pub users: Vec<UserRecord>,
    pub books: Vec<Book>,
    pub images: HashMap<i64, Vec<BookImage>>,
    pub favorites: HashMap<i64, BTreeSet<i64>>,
    pub genres: Vec<Genre>,
    pub regions: Vec<Region>,
    pub comunas: Vec<Comuna>,
    pub proposals: Vec<ProposalRecord>,
    pub exchanges: Vec<ExchangeEntry>,
    pub conversations: Vec<ConversationRecord>,
    pub ratings: Vec<RatingRecord>,
    pub reports: Vec<BookReport>,
    pub reset_tokens: HashMap<String, i64>,
}

impl MarketState {
    pub fn with_fixtures() -> Self {
        let mut state = Self {
            next_id: FIRST_DYNAMIC_ID,
            users: Vec::new(),
            books: Vec::new(),
            images: HashMap::new(),
            favorites: HashMap::new(),
            genres: Vec::new(),
            regions: Vec::new(),
            comunas: Vec::new(),
            proposals: Vec::new(),
            exchanges: Vec::new(),
            conversations: Vec::new(),
            ratings: Vec::new(),
            reports: Vec::new(),
            reset_tokens: HashMap::new(),
        };
        state.seed();
        state
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -- Fixtures --

    fn seed(&mut self) {
        self.genres = vec![
            genre(1, "Novela"),
            genre(2, "Ciencia Ficción"),
            genre(3, "Historia"),
        ];
        self.regions = vec![Region {
            id: 1,
            name: "Metropolitana".into(),
        }];
        self.comunas = vec![
            Comuna {
                id: 1,
                name: "Santiago".into(),
                region_id: 1,
            },
            Comuna {
                id: 2,
                name: "Providencia".into(),
                region_id: 1,
            },
        ];

        self.users.push(member(1, "ana", "ana@cambioteca.cl", "ana-secret", false));
        self.users.push(member(2, "benja", "benja@cambioteca.cl", "benja-secret", false));
        self.users.push(member(9, "moderadora", "admin@cambioteca.cl", "admin-secret", true));

        self.books.push(listing(7, "Rayuela", "Julio Cortázar", 1, 1, "Bueno"));
        self.books.push(listing(8, "El Aleph", "Jorge Luis Borges", 1, 1, "Nuevo"));
        self.books.push(listing(42, "Dune", "Frank Herbert", 2, 2, "Bueno"));
        self.books.push(listing(43, "Fundación", "Isaac Asimov", 2, 2, "Aceptable"));
        self.images.insert(
            42,
            vec![BookImage {
                id: 1,
                url: "/media/books/42/cover.jpg".into(),
                is_cover: true,
                position: 0,
            }],
        );
    }

    // -- Lookups --

    pub fn user(&self, id: i64) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.user.id == id)
    }

    pub fn user_mut(&mut self, id: i64) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.user.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.user.email == email)
    }

    pub fn book(&self, id: i64) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    pub fn book_mut(&mut self, id: i64) -> Option<&mut Book> {
        self.books.iter_mut().find(|b| b.id == id)
    }

    pub fn proposal(&self, id: i64) -> Option<&ProposalRecord> {
        self.proposals.iter().find(|p| p.id == id)
    }

    pub fn proposal_mut(&mut self, id: i64) -> Option<&mut ProposalRecord> {
        self.proposals.iter_mut().find(|p| p.id == id)
    }

    pub fn exchange(&self, id: i64) -> Option<&ExchangeEntry> {
        self.exchanges.iter().find(|x| x.id == id)
    }

    pub fn exchange_mut(&mut self, id: i64) -> Option<&mut ExchangeEntry> {
        self.exchanges.iter_mut().find(|x| x.id == id)
    }

    pub fn conversation(&self, id: i64) -> Option<&ConversationRecord> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversation_mut(&mut self, id: i64) -> Option<&mut ConversationRecord> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    // -- Wire projections --

    pub fn user_ref(&self, id: i64) -> UserRef {
        match self.user(id) {
            Some(record) => UserRef {
                id,
                username: record.user.username.clone(),
                avatar_path: record.user.avatar_path.clone(),
            },
            None => UserRef {
                id,
                username: "usuario eliminado".into(),
                avatar_path: None,
            },
        }
    }

    pub fn book_ref(&self, id: i64) -> BookRef {
        match self.book(id) {
            Some(book) => BookRef {
                id,
                title: book.title.clone(),
                author: Some(book.author.clone()),
            },
            None => BookRef {
                id,
                title: "Libro eliminado".into(),
                author: None,
            },
        }
    }

    /// The proposal as both list endpoints serve it. Meeting place and time
    /// come from the live exchange; before one exists they stay null, and
    /// an exchange without an agreed place shows the placeholder.
    pub fn project_proposal(&self, record: &ProposalRecord) -> Proposal {
        let exchange = record.exchange_id.and_then(|id| self.exchange(id));
        let (place, time) = match exchange {
            Some(x) => (
                Some(
                    x.meeting
                        .place
                        .clone()
                        .unwrap_or_else(|| MEETING_PLACE_UNSET.to_owned()),
                ),
                x.meeting.time.clone(),
            ),
            None => (None, None),
        };
        Proposal {
            id: record.id,
            status: record.status,
            requested_book: self.book_ref(record.requested_book_id),
            requester: self.user_ref(record.requester_id),
            recipient: self.user_ref(record.recipient_id),
            offers: record
                .offers
                .iter()
                .map(|o| Offer {
                    id: o.id,
                    book: self.book_ref(o.book_id),
                })
                .collect(),
            accepted_book: record.accepted_book_id.map(|id| self.book_ref(id)),
            conversation_id: record.conversation_id,
            exchange_id: record.exchange_id,
            meeting_place: place,
            meeting_time: time,
        }
    }

    pub fn conversation_summaries(&self, user_id: i64) -> Vec<ConversationSummary> {
        self.conversations
            .iter()
            .filter(|c| c.participants.contains(&user_id))
            .map(|c| {
                let counterpart_id = if c.participants[0] == user_id {
                    c.participants[1]
                } else {
                    c.participants[0]
                };
                let (mine, theirs, status) = match self.exchange(c.exchange_id) {
                    Some(x) => {
                        let (my_book, their_book) = if x.offerer_id == user_id {
                            (x.requested_book_id, x.offered_book_id)
                        } else {
                            (x.offered_book_id, x.requested_book_id)
                        };
                        (
                            Some(self.book_ref(my_book).title),
                            Some(self.book_ref(their_book).title),
                            Some(exchange_status_name(x.completed).to_owned()),
                        )
                    }
                    None => (None, None, None),
                };
                ConversationSummary {
                    id: c.id,
                    counterpart: self.user_ref(counterpart_id),
                    my_book_title: mine,
                    counterpart_book_title: theirs,
                    exchange_status: status,
                }
            })
            .collect()
    }

    /// History rows relative to `user_id`: "my book" is the one this user
    /// put into the exchange.
    pub fn exchange_rows(&self, user_id: i64) -> Vec<wire::ExchangeRecord> {
        self.exchanges
            .iter()
            .filter(|x| x.offerer_id == user_id || x.requester_id == user_id)
            .map(|x| {
                let (my_book, their_book) = if x.offerer_id == user_id {
                    (x.requested_book_id, x.offered_book_id)
                } else {
                    (x.offered_book_id, x.requested_book_id)
                };
                wire::ExchangeRecord {
                    id: x.id,
                    status: if x.completed {
                        ExchangeStatus::Completed
                    } else {
                        ExchangeStatus::Accepted
                    },
                    offerer_id: x.offerer_id,
                    requester_id: x.requester_id,
                    my_book_title: Some(self.book_ref(my_book).title),
                    counterpart_book_title: Some(self.book_ref(their_book).title),
                }
            })
            .collect()
    }

    pub fn user_metrics(&self, user_id: i64) -> UserMetrics {
        let received: Vec<&RatingRecord> = self
            .ratings
            .iter()
            .filter(|r| r.ratee_id == user_id)
            .collect();
        let average = if received.is_empty() {
            None
        } else {
            Some(received.iter().map(|r| f64::from(r.score)).sum::<f64>() / received.len() as f64)
        };
        UserMetrics {
            books_published: self.books.iter().filter(|b| b.owner_id == user_id).count() as i64,
            exchanges_completed: self
                .exchanges
                .iter()
                .filter(|x| x.completed && (x.offerer_id == user_id || x.requester_id == user_id))
                .count() as i64,
            average_rating: average,
            ratings_count: received.len() as i64,
        }
    }

    pub fn user_ratings(&self, user_id: i64) -> Vec<UserRating> {
        self.ratings
            .iter()
            .filter(|r| r.ratee_id == user_id || r.rater_id == user_id)
            .map(|r| UserRating {
                score: r.score,
                comment: Some(r.comment.clone()).filter(|c| !c.is_empty()),
                kind: if r.ratee_id == user_id {
                    wire::RatingKind::Received
                } else {
                    wire::RatingKind::Given
                },
                rater_username: Some(self.user_ref(r.rater_id).username),
            })
            .collect()
    }
}

pub fn exchange_status_name(completed: bool) -> &'static str {
    if completed { "Completado" } else { "Aceptado" }
}

fn genre(id: i64, name: &str) -> Genre {
    Genre {
        id,
        name: name.into(),
    }
}

fn member(id: i64, username: &str, email: &str, password: &str, admin: bool) -> UserRecord {
    UserRecord {
        user: User {
            id,
            username: username.into(),
            email: email.into(),
            given_names: None,
            paternal_surname: None,
            maternal_surname: None,
            phone: None,
            address: None,
            avatar_path: None,
            is_admin: admin,
        },
        password: password.into(),
        active: true,
    }
}

fn listing(id: i64, title: &str, author: &str, owner_id: i64, genre_id: i64, condition: &str) -> Book {
    Book {
        id,
        title: title.into(),
        author: author.into(),
        isbn: None,
        year_published: None,
        publisher: None,
        genre_id: Some(genre_id),
        condition: condition.into(),
        description: None,
        available: true,
        owner_id,
        first_image: None,
    }
}
