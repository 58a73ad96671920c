pub mod channel;
pub mod rdt;
pub mod sim;
pub mod trace;

#[cfg(test)]
mod test;
