#![cfg(test)]

mod discovery;
mod drives;
mod net;
