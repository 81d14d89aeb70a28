//! Catalog management service: authors, books, libraries and copies

use std::collections::{HashMap, HashSet};

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookQuery, CreateBook, UpdateBook},
        copy::{Copy, CreateCopy},
        library::{Library, LibraryData, LibraryPatch},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Authors

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i64) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        author.validate()?;
        let created = self.repository.authors.create(&author).await?;
        tracing::info!(author_id = created.id, "Author created");
        Ok(created)
    }

    pub async fn update_author(&self, id: i64, author: UpdateAuthor) -> AppResult<Author> {
        author.validate()?;
        self.repository.authors.update(id, &author).await
    }

    pub async fn delete_author(&self, id: i64) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // Books

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        if let Some(author_id) = book.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }
        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i64, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        if let Some(author_id) = book.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }
        self.repository.books.update(id, &book).await
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    pub async fn book_copies(&self, book_id: i64) -> AppResult<Vec<Copy>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.list_for_book(book_id).await
    }

    // Libraries

    pub async fn list_libraries(&self) -> AppResult<Vec<Library>> {
        self.repository.libraries.list().await
    }

    pub async fn get_library(&self, id: i64) -> AppResult<Library> {
        self.repository.libraries.get_by_id(id).await
    }

    pub async fn create_library(&self, data: LibraryData) -> AppResult<Library> {
        data.validate()?;
        let created = self.repository.libraries.create(&data).await?;
        tracing::info!(library_id = created.id, "Library created");
        Ok(created)
    }

    pub async fn update_library(&self, id: i64, data: LibraryData) -> AppResult<Library> {
        data.validate()?;
        let library = Library {
            id,
            name: data.name,
            address: data.address,
            city: data.city,
            phone: data.phone,
        };
        self.repository.libraries.save(&library).await
    }

    /// Update only the given fields
    pub async fn patch_library(&self, id: i64, fields: HashMap<String, String>) -> AppResult<Library> {
        let patch = LibraryPatch::from_fields(fields)?;
        let mut library = self.repository.libraries.get_by_id(id).await?;
        patch.apply(&mut library);
        self.repository.libraries.save(&library).await
    }

    pub async fn delete_library(&self, id: i64) -> AppResult<()> {
        self.repository.libraries.delete(id).await
    }

    pub async fn library_books(&self, id: i64) -> AppResult<HashSet<Book>> {
        self.repository.libraries.get_by_id(id).await?;
        let books = self.repository.libraries.books(id).await?;
        Ok(books.into_iter().collect())
    }

    pub async fn add_book_to_library(&self, library_id: i64, book_id: i64) -> AppResult<Library> {
        let library = self.repository.libraries.get_by_id(library_id).await?;
        self.repository.books.get_by_id(book_id).await?;
        self.repository.libraries.add_book(library_id, book_id).await?;
        tracing::info!(library_id, book_id, "Book added to library");
        Ok(library)
    }

    // Copies

    pub async fn get_copy(&self, id: i64) -> AppResult<Copy> {
        self.repository.copies.get_by_id(id).await
    }

    pub async fn create_copy(&self, copy: CreateCopy) -> AppResult<Copy> {
        copy.validate()?;
        if let Some(book_id) = copy.book_id {
            self.repository.books.get_by_id(book_id).await?;
        }
        if let Some(library_id) = copy.library_id {
            self.repository.libraries.get_by_id(library_id).await?;
        }
        let created = self.repository.copies.create(&copy).await?;
        tracing::info!(copy_id = created.id, copy_number = created.copy_number, "Copy registered");
        Ok(created)
    }

    pub async fn delete_copy(&self, id: i64) -> AppResult<()> {
        self.repository.copies.delete(id).await
    }
}
