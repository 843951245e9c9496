mod babies;
mod diapers;
mod growth;
mod sessions;
