/*!
 * Media catalogue API.
 *
 * - `client`: async HTTP client (`LookeClient`) for lookups and subtitle downloads
 * - `body`: `findmedia` request body builders
 * - `models`: response models
 */

pub mod body;
pub mod client;
pub mod models;

pub use client::LookeClient;
pub use models::{Media, SubtitleTrack};
