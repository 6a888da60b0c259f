mod locale;
mod theme;
