pub mod concurrent;
