mod sender;
mod support;
