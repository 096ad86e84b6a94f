pub mod manager_url;
