/*!
 * Core Module
 *
 * Fundamental types shared by every other module: the inline-string
 * optimization used for device/signal/component names.
 */

pub mod data_structures;

pub use data_structures::InlineString;
