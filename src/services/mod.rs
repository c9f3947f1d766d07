pub mod delay_feed;

pub use delay_feed::DelayFeed;
