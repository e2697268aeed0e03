pub mod movie;
pub mod profile;

pub use movie::{
    Category, MovieCandidate, MovieListing, TmdbCastMember, TmdbCredits, TmdbCrewMember,
    TmdbGenre, TmdbMovieDetails, COVER_IMAGE_BASE,
};
pub use profile::{Interaction, InteractionType, Profile, SuggestedMovie, TasteProfile};
